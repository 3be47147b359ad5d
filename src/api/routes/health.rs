//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::HealthResponse};
use crate::storage::StorageBackend;

/// GET /api/v1/health
///
/// Reports "ok" while the storage backend answers, "degraded" otherwise
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let (status, storage) = match state.storage().health_check().await {
        Ok(health) if health.healthy => ("ok", health.message),
        Ok(health) => ("degraded", health.message),
        Err(e) => ("degraded", e.to_string()),
    };

    Json(HealthResponse {
        status: status.to_string(),
        storage,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
