//! HTTP surface of the collector
//!
//! ## Endpoints
//!
//! - `POST <report_path>` - Ingest an agent report (default `/alarm`)
//! - `GET /api/v1/health` - Health check including storage status
//! - `GET /api/v1/snapshots/:id` - One stored snapshot
//! - `GET /api/v1/snapshots/:id/alerts` - Alerts raised for a snapshot
//!
//! Every request runs in its own task; the only shared resource is the
//! storage backend behind [`ApiState`].

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{AlertsResponse, HealthResponse};

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Path agents POST their reports to
    pub report_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            report_path: "/alarm".to_string(),
        }
    }
}

/// Build the collector router
pub fn router(report_path: &str, state: ApiState) -> Router {
    Router::new()
        .route(report_path, post(routes::report::receive_report))
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/snapshots/:id", get(routes::snapshots::get_snapshot))
        .route(
            "/api/v1/snapshots/:id/alerts",
            get(routes::snapshots::get_snapshot_alerts),
        )
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting collector on {}", config.bind_addr);

    if !config.report_path.starts_with('/') {
        anyhow::bail!("report path must start with '/': {}", config.report_path);
    }

    let app = router(&config.report_path, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!(
        "collector listening on {} (reports at {})",
        addr, config.report_path
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
