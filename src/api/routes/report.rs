//! Report ingestion endpoint

use axum::{body::Bytes, extract::State, http::StatusCode};
use tracing::{debug, instrument};

use crate::api::{error::ApiResult, state::ApiState};

/// POST <report_path>
///
/// Accepts one agent report. Responds 200 with an empty body once the snapshot
/// is stored; alerting happens before the response but never changes it.
///
/// The ingestion runs in its own task, so a client hanging up mid-request does
/// not abort alert processing for a snapshot that was already written.
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn receive_report(State(state): State<ApiState>, body: Bytes) -> ApiResult<StatusCode> {
    let ingestor = state.ingestor.clone();
    let outcome = tokio::spawn(async move { ingestor.ingest(&body).await }).await??;

    debug!("accepted snapshot {}", outcome.snapshot_id);
    Ok(StatusCode::OK)
}
