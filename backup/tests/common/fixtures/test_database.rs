//! Test database utilities for in-memory SQLite testing

use anyhow::Result;
use backup::Database;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::sync::Arc;

/// In-memory database shared through a single pooled connection
pub struct TestDatabase {
    database: Arc<Database>,
}

impl TestDatabase {
    /// Create an empty in-memory database
    pub async fn empty() -> Result<Self> {
        // One connection that never expires: closing it would drop the data
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self {
            database: Arc::new(Database::from_pool(pool)),
        })
    }

    /// Create an in-memory database with the clinic test schema
    pub async fn new() -> Result<Self> {
        let db = Self::empty().await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn database(&self) -> Arc<Database> {
        self.database.clone()
    }

    pub fn pool(&self) -> &SqlitePool {
        self.database.pool()
    }

    /// Create the test schema
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE,
                is_admin BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER REFERENCES users(id),
                message TEXT
            )
            "#,
        )
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Insert a user row
    pub async fn insert_user(&self, id: i64, name: &str, email: Option<&str>, is_admin: bool) -> Result<()> {
        sqlx::query("INSERT INTO users (id, name, email, is_admin, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(email)
            .bind(is_admin)
            .bind("2024-01-05 10:30:00")
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM \"{}\"", table))
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get("n")?)
    }

    pub async fn user_name(&self, id: i64) -> Result<Option<String>> {
        let row = sqlx::query("SELECT name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(|r| r.get("name")))
    }

    pub async fn foreign_keys_enabled(&self) -> Result<bool> {
        let row = sqlx::query("PRAGMA foreign_keys").fetch_one(self.pool()).await?;
        Ok(row.try_get::<i64, _>(0)? == 1)
    }
}
