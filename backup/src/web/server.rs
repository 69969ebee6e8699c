use crate::config::Config;
use crate::services::BackupService;
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub async fn start_web_server(
    config: Arc<Config>,
    backup_service: Arc<BackupService>,
) -> Result<()> {
    let state = AppState::new(config.clone(), backup_service);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        // === BACKUP / RESTORE ROUTES ===
        .route("/api/backup", get(handlers::download_backup))
        .route(
            "/api/restore",
            post(handlers::restore_backup).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // === HEALTH ===
        .route("/api/health", get(handlers::get_health))
        // Add middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
