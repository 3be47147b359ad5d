//! SQLite storage backend implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers do not block the ingestion writes
//! - **Connection pooling**: One pool shared by all request tasks
//! - **Migrations**: Automatic schema versioning with sqlx
//! - **Foreign keys**: `alert_events.snapshot_id` must reference a stored snapshot
//!
//! Every statement is parameterized; no externally supplied value is ever
//! interpolated into SQL text.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::backend::{AlertLog, HealthStatus, ReportStore, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{AlertRow, SnapshotRow};
use crate::{AlertEvent, AlertId, AlertKind, MetricSnapshot, SnapshotId, timestamp};

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite (WAL mode, foreign keys, busy timeout)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use hostwatch::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./hostwatch.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("SQLite backend ready");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }
}

#[async_trait]
impl ReportStore for SqliteBackend {
    #[instrument(skip_all, fields(host = %snapshot.host_name))]
    async fn save(&self, snapshot: &MetricSnapshot) -> StorageResult<SnapshotId> {
        let id = snapshot.id.unwrap_or_else(Uuid::now_v7);
        let row = SnapshotRow::from_snapshot(id, snapshot, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO snapshots (
                id, host_name, captured_at, host_info, mem_info,
                cpu_info, disk_info, disk_io_info, received_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.host_name)
        .bind(&row.captured_at)
        .bind(&row.host_info)
        .bind(&row.mem_info)
        .bind(&row.cpu_info)
        .bind(&row.disk_info)
        .bind(&row.disk_io_info)
        .bind(row.received_at)
        .execute(&self.pool)
        .await?;

        debug!("stored snapshot {id}");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: SnapshotId) -> StorageResult<Option<MetricSnapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT id, host_name, captured_at, host_info, mem_info,
                   cpu_info, disk_info, disk_io_info, received_at
            FROM snapshots
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SnapshotRow::into_snapshot).transpose()
    }

    async fn snapshot_count(&self) -> StorageResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }
}

#[async_trait]
impl AlertLog for SqliteBackend {
    #[instrument(skip_all, fields(kind = %event.kind, snapshot = %event.snapshot_id))]
    async fn record(&self, event: &AlertEvent) -> StorageResult<AlertId> {
        let row = AlertRow::from_event(event);

        let result = sqlx::query(
            r#"
            INSERT INTO alert_events (
                id, snapshot_id, host_name, kind, resource, detail, triggered_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.snapshot_id)
        .bind(&row.host_name)
        .bind(&row.kind)
        .bind(&row.resource)
        .bind(&row.detail)
        .bind(&row.triggered_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(event.id),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(StorageError::UnknownSnapshot(event.snapshot_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn alerts_for_snapshot(&self, snapshot_id: SnapshotId) -> StorageResult<Vec<AlertEvent>> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, snapshot_id, host_name, kind, resource, detail, triggered_at
            FROM alert_events
            WHERE snapshot_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(snapshot_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertRow::into_event).collect()
    }

    #[instrument(skip(self))]
    async fn last_triggered(
        &self,
        host_name: &str,
        kind: AlertKind,
        resource: Option<&str>,
    ) -> StorageResult<Option<NaiveDateTime>> {
        let row: (Option<String>,) = sqlx::query_as(
            r#"
            SELECT MAX(triggered_at)
            FROM alert_events
            WHERE host_name = ? AND kind = ? AND resource IS ?
            "#,
        )
        .bind(host_name)
        .bind(kind.as_str())
        .bind(resource)
        .fetch_one(&self.pool)
        .await?;

        row.0
            .map(|raw| {
                timestamp::parse(&raw).map_err(|e| {
                    StorageError::SerializationError(format!("invalid triggered_at {raw:?}: {e}"))
                })
            })
            .transpose()
    }

    async fn alert_count(&self) -> StorageResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alert_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    /// Healthy when the pool is open and both tables answer
    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        if self.pool.is_closed() {
            return Ok(HealthStatus {
                healthy: false,
                message: format!("SQLite pool for {} is closed", self.db_path),
                metadata: HashMap::from([("backend".to_string(), "sqlite".to_string())]),
            });
        }

        let counts: Result<(i64, i64), _> = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM snapshots), (SELECT COUNT(*) FROM alert_events)",
        )
        .fetch_one(&self.pool)
        .await;

        Ok(match counts {
            Ok((snapshots, alerts)) => HealthStatus {
                healthy: true,
                message: format!("SQLite backend operational at {}", self.db_path),
                metadata: HashMap::from([
                    ("backend".to_string(), "sqlite".to_string()),
                    ("snapshots".to_string(), snapshots.to_string()),
                    ("alerts".to_string(), alerts.to_string()),
                ]),
            },
            Err(e) => {
                warn!("snapshot tables unreachable: {e}");
                HealthStatus {
                    healthy: false,
                    message: format!("snapshot tables unreachable: {e}"),
                    metadata: HashMap::from([("backend".to_string(), "sqlite".to_string())]),
                }
            }
        })
    }

    /// Row counts plus the newest capture time, e.g. for the startup banner
    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let (snapshots, alerts, latest): (i64, i64, Option<String>) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM snapshots), \
                    (SELECT COUNT(*) FROM alert_events), \
                    (SELECT MAX(captured_at) FROM snapshots)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(format!(
            "SQLite ({}): {snapshots} snapshots, {alerts} alerts, latest capture {}",
            self.db_path,
            latest.as_deref().unwrap_or("none")
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        if !self.pool.is_closed() {
            debug!("closing SQLite pool for {}", self.db_path);
            self.pool.close().await;
        }
        Ok(())
    }
}
