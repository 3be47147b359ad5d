//! Storage backends for snapshots and alert events
//!
//! Two append-only logs share one backend:
//!
//! - **Report store**: one row per ingested [`MetricSnapshot`](crate::MetricSnapshot)
//! - **Alert log**: one row per triggered [`AlertEvent`](crate::AlertEvent),
//!   always referencing a stored snapshot
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded database, migrations managed by sqlx
//! - **In-Memory**: no persistence, for tests or `"backend": "none"`
//!
//! ## Usage
//!
//! ```no_run
//! use hostwatch::storage::{ReportStore, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./hostwatch.db").await?;
//!     println!("{} snapshots stored", backend.snapshot_count().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

use std::sync::Arc;

pub use backend::{AlertLog, HealthStatus, ReportStore, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use schema::{AlertRow, SnapshotRow};

use crate::config::StorageConfig;

/// Open the backend selected in the configuration
pub async fn open(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => Ok(Arc::new(memory::MemoryBackend::new())),
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Arc::new(sqlite::SqliteBackend::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(StorageError::ConnectionFailed(
            "built without the storage-sqlite feature".to_string(),
        )),
    }
}
