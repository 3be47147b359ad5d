//! Snapshot lookup endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    MetricSnapshot, SnapshotId,
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::AlertsResponse,
    },
    storage::{AlertLog, ReportStore},
};

fn parse_id(raw: &str) -> ApiResult<SnapshotId> {
    Uuid::parse_str(raw).map_err(|e| ApiError::InvalidRequest(format!("invalid snapshot id: {e}")))
}

/// GET /api/v1/snapshots/:id
pub async fn get_snapshot(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MetricSnapshot>> {
    let id = parse_id(&id)?;

    state
        .storage()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("snapshot {id} not found")))
}

/// GET /api/v1/snapshots/:id/alerts
pub async fn get_snapshot_alerts(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AlertsResponse>> {
    let id = parse_id(&id)?;

    if state.storage().get(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("snapshot {id} not found")));
    }

    let alerts = state.storage().alerts_for_snapshot(id).await?;

    Ok(Json(AlertsResponse {
        snapshot_id: id,
        count: alerts.len(),
        alerts,
    }))
}
