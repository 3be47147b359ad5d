//! In-memory storage backend (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Running a collector with `"backend": "none"`
//!
//! All data is lost on restart. Rows go through the same encoding as the
//! SQLite backend, so lookups behave identically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::backend::{AlertLog, HealthStatus, ReportStore, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{AlertRow, SnapshotRow};
use crate::{AlertEvent, AlertId, AlertKind, MetricSnapshot, SnapshotId, timestamp};

#[derive(Debug, Default)]
struct Tables {
    snapshots: Vec<SnapshotRow>,
    index: HashMap<String, usize>,
    alerts: Vec<AlertRow>,
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory backend closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryBackend {
    async fn save(&self, snapshot: &MetricSnapshot) -> StorageResult<SnapshotId> {
        self.ensure_open()?;
        let id = snapshot.id.unwrap_or_else(Uuid::now_v7);
        let row = SnapshotRow::from_snapshot(id, snapshot, Utc::now())?;

        let mut tables = self.tables.write().await;
        if tables.index.contains_key(&row.id) {
            return Err(StorageError::QueryFailed(format!("duplicate snapshot id {id}")));
        }
        let position = tables.snapshots.len();
        tables.index.insert(row.id.clone(), position);
        tables.snapshots.push(row);

        debug!("stored snapshot {id} in memory");
        Ok(id)
    }

    async fn get(&self, id: SnapshotId) -> StorageResult<Option<MetricSnapshot>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        tables
            .index
            .get(&id.to_string())
            .map(|&position| tables.snapshots[position].clone().into_snapshot())
            .transpose()
    }

    async fn snapshot_count(&self) -> StorageResult<u64> {
        Ok(self.tables.read().await.snapshots.len() as u64)
    }
}

#[async_trait]
impl AlertLog for MemoryBackend {
    async fn record(&self, event: &AlertEvent) -> StorageResult<AlertId> {
        self.ensure_open()?;
        let row = AlertRow::from_event(event);

        let mut tables = self.tables.write().await;
        if !tables.index.contains_key(&row.snapshot_id) {
            return Err(StorageError::UnknownSnapshot(event.snapshot_id));
        }
        if tables.alerts.iter().any(|alert| alert.id == row.id) {
            return Err(StorageError::QueryFailed(format!("duplicate alert id {}", event.id)));
        }
        tables.alerts.push(row);

        Ok(event.id)
    }

    async fn alerts_for_snapshot(&self, snapshot_id: SnapshotId) -> StorageResult<Vec<AlertEvent>> {
        self.ensure_open()?;
        let snapshot_id = snapshot_id.to_string();
        let tables = self.tables.read().await;
        tables
            .alerts
            .iter()
            .filter(|alert| alert.snapshot_id == snapshot_id)
            .cloned()
            .map(AlertRow::into_event)
            .collect()
    }

    async fn last_triggered(
        &self,
        host_name: &str,
        kind: AlertKind,
        resource: Option<&str>,
    ) -> StorageResult<Option<NaiveDateTime>> {
        self.ensure_open()?;
        let tables = self.tables.read().await;
        tables
            .alerts
            .iter()
            .filter(|alert| {
                alert.host_name == host_name
                    && alert.kind == kind.as_str()
                    && alert.resource.as_deref() == resource
            })
            .map(|alert| alert.triggered_at.as_str())
            .max()
            .map(|raw| {
                timestamp::parse(raw).map_err(|e| {
                    StorageError::SerializationError(format!("invalid triggered_at {raw:?}: {e}"))
                })
            })
            .transpose()
    }

    async fn alert_count(&self) -> StorageResult<u64> {
        Ok(self.tables.read().await.alerts.len() as u64)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let healthy = !self.closed.load(Ordering::SeqCst);
        let tables = self.tables.read().await;
        Ok(HealthStatus {
            healthy,
            message: if healthy {
                "In-memory storage operational".to_string()
            } else {
                "In-memory storage closed".to_string()
            },
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("snapshots".to_string(), tables.snapshots.len().to_string()),
            ]),
        })
    }

    async fn get_stats(&self) -> StorageResult<String> {
        let tables = self.tables.read().await;
        Ok(format!(
            "In-Memory: {} snapshots, {} alerts",
            tables.snapshots.len(),
            tables.alerts.len()
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
