//! Storage trait definitions
//!
//! The report store and the alert log are separate capabilities so the
//! ingestion path can be tested against each failure independently.
//! [`StorageBackend`] bundles both with maintenance operations.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::error::StorageResult;
use crate::{AlertEvent, AlertId, AlertKind, MetricSnapshot, SnapshotId};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Append-only persistence of metric snapshots
///
/// Nested sections are stored as opaque blobs; the store never validates
/// or rewrites their content.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a snapshot and return its id
    ///
    /// Uses `snapshot.id` when present, otherwise assigns a fresh one.
    /// Once this returns `Ok`, the row is durable.
    async fn save(&self, snapshot: &MetricSnapshot) -> StorageResult<SnapshotId>;

    /// Look a snapshot up by id
    async fn get(&self, id: SnapshotId) -> StorageResult<Option<MetricSnapshot>>;

    /// Number of stored snapshots
    async fn snapshot_count(&self) -> StorageResult<u64>;
}

/// Append-only persistence of alert events
#[async_trait]
pub trait AlertLog: Send + Sync {
    /// Persist an alert event; its snapshot must already be stored
    async fn record(&self, event: &AlertEvent) -> StorageResult<AlertId>;

    /// All alerts raised for a snapshot, in trigger order
    async fn alerts_for_snapshot(&self, snapshot_id: SnapshotId) -> StorageResult<Vec<AlertEvent>>;

    /// Latest `triggered_at` recorded for a host/kind/resource key
    async fn last_triggered(
        &self,
        host_name: &str,
        kind: AlertKind,
        resource: Option<&str>,
    ) -> StorageResult<Option<NaiveDateTime>>;

    /// Number of stored alert events
    async fn alert_count(&self) -> StorageResult<u64>;
}

/// A complete backend: both logs plus maintenance operations
///
/// Implementations must be `Send + Sync` as they are shared across
/// request tasks.
#[async_trait]
pub trait StorageBackend: ReportStore + AlertLog {
    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable stats (e.g. "SQLite: 120 snapshots, 4 alerts")
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
