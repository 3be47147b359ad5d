//! Row layouts for the `snapshots` and `alert_events` tables
//!
//! ## Design
//!
//! Snapshots use a hybrid layout:
//!
//! ### Scalar columns
//! - `host_name`, `captured_at` for lookups by host and time
//! - `received_at` (collector clock, Unix millis) for operational queries
//!
//! ### Opaque blobs (JSON)
//! - `host_info`, `mem_info`, `cpu_info`, `disk_info`, `disk_io_info`
//!
//! Blobs are written exactly as the typed sections serialize, with the agent's
//! wire keys, so a stored snapshot reads back identical to what was ingested.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::error::{StorageError, StorageResult};
use crate::{AlertEvent, MetricSnapshot, SnapshotId, timestamp};

/// One row of the `snapshots` table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "storage-sqlite", derive(sqlx::FromRow))]
pub struct SnapshotRow {
    pub id: String,
    pub host_name: String,
    /// `YYYY-MM-DD HH:MM:SS`, sorts chronologically as text
    pub captured_at: String,
    pub host_info: String,
    pub mem_info: String,
    pub cpu_info: String,
    pub disk_info: String,
    pub disk_io_info: String,
    pub received_at: i64,
}

/// One row of the `alert_events` table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "storage-sqlite", derive(sqlx::FromRow))]
pub struct AlertRow {
    pub id: String,
    pub snapshot_id: String,
    pub host_name: String,
    pub kind: String,
    pub resource: Option<String>,
    pub detail: String,
    pub triggered_at: String,
}

fn blob<T: Serialize>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn unblob<T: DeserializeOwned>(column: &str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::SerializationError(format!("failed to decode {column}: {e}")))
}

fn parse_id(column: &str, raw: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| StorageError::SerializationError(format!("invalid {column} {raw:?}: {e}")))
}

impl SnapshotRow {
    pub fn from_snapshot(
        id: SnapshotId,
        snapshot: &MetricSnapshot,
        received_at: DateTime<Utc>,
    ) -> StorageResult<Self> {
        Ok(Self {
            id: id.to_string(),
            host_name: snapshot.host_name.clone(),
            captured_at: timestamp::format(&snapshot.captured_at),
            host_info: blob(&snapshot.host_info)?,
            mem_info: blob(&snapshot.mem_info)?,
            cpu_info: blob(&snapshot.cpu_info)?,
            disk_info: blob(&snapshot.disk_info)?,
            disk_io_info: blob(&snapshot.disk_io_info)?,
            received_at: received_at.timestamp_millis(),
        })
    }

    pub fn into_snapshot(self) -> StorageResult<MetricSnapshot> {
        let captured_at = timestamp::parse(&self.captured_at).map_err(|e| {
            StorageError::SerializationError(format!(
                "invalid captured_at {:?}: {e}",
                self.captured_at
            ))
        })?;

        Ok(MetricSnapshot {
            id: Some(parse_id("snapshot id", &self.id)?),
            host_name: self.host_name,
            captured_at,
            host_info: unblob("host_info", &self.host_info)?,
            mem_info: unblob("mem_info", &self.mem_info)?,
            cpu_info: unblob("cpu_info", &self.cpu_info)?,
            disk_info: unblob("disk_info", &self.disk_info)?,
            disk_io_info: unblob("disk_io_info", &self.disk_io_info)?,
        })
    }
}

impl AlertRow {
    pub fn from_event(event: &AlertEvent) -> Self {
        Self {
            id: event.id.to_string(),
            snapshot_id: event.snapshot_id.to_string(),
            host_name: event.host_name.clone(),
            kind: event.kind.to_string(),
            resource: event.resource.clone(),
            detail: event.detail.clone(),
            triggered_at: timestamp::format(&event.triggered_at),
        }
    }

    pub fn into_event(self) -> StorageResult<AlertEvent> {
        let triggered_at = timestamp::parse(&self.triggered_at).map_err(|e| {
            StorageError::SerializationError(format!(
                "invalid triggered_at {:?}: {e}",
                self.triggered_at
            ))
        })?;

        Ok(AlertEvent {
            id: parse_id("alert id", &self.id)?,
            snapshot_id: parse_id("snapshot id", &self.snapshot_id)?,
            host_name: self.host_name,
            kind: self.kind.parse().map_err(StorageError::SerializationError)?,
            resource: self.resource,
            detail: self.detail,
            triggered_at,
        })
    }
}
