//! API response types

use serde::{Deserialize, Serialize};

use crate::{AlertEvent, SnapshotId};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub timestamp: String,
}

/// Alerts raised for one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub snapshot_id: SnapshotId,
    pub count: usize,
    pub alerts: Vec<AlertEvent>,
}
