//! Common test data and helpers

use std::io::{Cursor, Read};

pub const ADMIN_TOKEN: &str = "admin-test-token";
pub const STAFF_TOKEN: &str = "staff-test-token";
pub const MULTIPART_BOUNDARY: &str = "----backup-test-boundary";

/// Backup in the exporter's format with two users and no logs
pub const SAMPLE_BACKUP: &str = r#"-- Database backup
-- Generated at: 2024-01-05T10:30:00.000Z
-- Total tables: 2

PRAGMA foreign_keys = OFF;

-- Table: main.logs (0 records)
-- No records in main.logs

-- Table: main.users (2 records)
INSERT INTO "main"."users" ("id", "name", "email", "is_admin", "created_at") VALUES (1, 'Amina Okafor', 'amina@clinic.test', TRUE, '2024-01-05T10:30:00.000Z');
INSERT INTO "main"."users" ("id", "name", "email", "is_admin", "created_at") VALUES (2, 'Sean O''Brien', NULL, FALSE, NULL);

PRAGMA foreign_keys = ON;
"#;

/// Build a multipart/form-data body with an optional file and mode field
pub fn multipart_body(file: Option<&[u8]>, mode: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(mode) = mode {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"mode\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, mode
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"backupFile\"; filename=\"backup.sql\"\r\nContent-Type: application/sql\r\n\r\n",
                MULTIPART_BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
}

/// Names of the entries in a zip archive
pub fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");
    archive.file_names().map(str::to_string).collect()
}

/// Read the SQL entry out of an exported archive
pub fn read_sql_entry(bytes: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");
    let mut entry = archive
        .by_name("database_backup.sql")
        .expect("archive contains database_backup.sql");
    let mut sql = String::new();
    entry.read_to_string(&mut sql).expect("UTF-8 SQL entry");
    sql
}

pub fn count_inserts(sql: &str) -> usize {
    sql.lines().filter(|line| line.starts_with("INSERT INTO ")).count()
}

/// Statements in an exported dump: INSERT lines plus the pragma pair
pub fn count_statements(sql: &str) -> usize {
    sql.lines()
        .filter(|line| line.starts_with("INSERT INTO ") || line.starts_with("PRAGMA "))
        .count()
}
