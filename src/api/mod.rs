//! HTTP API exposing the scanner over REST.
//!
//! All endpoints return JSON. Validation failures are 422 `{error,
//! message}`; rate-limit (cooldown) hits are not errors, the cached row is
//! returned instead.

mod handlers;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::service::ScanService;

pub use types::{ApiError, BatchRequest, HostQuery};

/// Builds the `/api/v2` router around a scan service.
pub fn router(service: Arc<ScanService>) -> Router {
    Router::new()
        .route("/api/v2/scan", post(handlers::scan))
        .route("/api/v2/scanFullDetails", post(handlers::scan_full_details))
        .route(
            "/api/v2/analyze",
            get(handlers::analyze_get).post(handlers::analyze_post),
        )
        .route(
            "/api/v2/scanBatchFullDetails",
            post(handlers::scan_batch_full_details),
        )
        .route("/api/v2/stats", get(handlers::stats))
        .with_state(service)
}

/// Binds the API server and serves until the process exits.
pub async fn serve(port: u16, service: Arc<ScanService>) -> Result<(), anyhow::Error> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind API server to port {port}: {e}"))?;

    log::info!("API server listening on http://0.0.0.0:{port}/api/v2/");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {e}"))?;

    Ok(())
}
