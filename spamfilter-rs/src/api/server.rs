//! API Server - HTTP consumer interface for the forum

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::{self, AppState};
use crate::error::Result;

/// Build the router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/spam/predict", post(handlers::predict))
        .route("/spam/labels", post(handlers::upsert_label))
        .route("/spam/corrections", post(handlers::record_correction))
        .route("/spam/retrain", post(handlers::retrain))
        .route("/spam/stats", get(handlers::stats))
        .route("/schedule", get(handlers::schedule_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl-C
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
}
