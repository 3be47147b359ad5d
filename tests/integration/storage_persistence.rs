//! Integration tests for SQLite persistence
//!
//! These tests verify that:
//! - Snapshots and alerts survive a collector restart
//! - A closed database fails ingestion without partial writes
//! - The configured backend is selected by `storage::open`

use std::sync::Arc;

use assert_matches::assert_matches;
use hostwatch::{
    AlertKind,
    config::StorageConfig,
    ingest::IngestError,
    storage::{self, AlertLog, ReportStore, StorageBackend, sqlite::SqliteBackend},
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::*;

#[tokio::test]
async fn test_data_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("collector.db");

    let snapshot_id = {
        let storage = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
        let sink = RecordingSink::new(SinkMode::Accept);
        let ingestor = create_ingestor(storage.clone(), sink, thresholds(80.0, 80.0, 80.0));

        let outcome = ingestor
            .ingest(&body(&report("web-01", "85.00%", &["12.00%"], &[("/", "40%")])))
            .await
            .unwrap();
        storage.close().await.unwrap();
        outcome.snapshot_id
    };

    let storage = SqliteBackend::new(&db_path).await.unwrap();
    let snapshot = storage.get(snapshot_id).await.unwrap().unwrap();
    assert_eq!(snapshot.host_name, "web-01");
    assert_eq!(snapshot.mem_info.usage.as_deref(), Some("85.00%"));
    assert_eq!(snapshot.cpu_info[0].usage.as_deref(), Some("12.00%"));

    let alerts = storage.alerts_for_snapshot(snapshot_id).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Memory);
}

#[tokio::test]
async fn test_closed_database_writes_nothing() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("collector.db");

    let storage = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
    storage.close().await.unwrap();

    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage, sink.clone(), thresholds(80.0, 80.0, 80.0));

    let result = ingestor
        .ingest(&body(&report("web-01", "99%", &[], &[("/", "99%")])))
        .await;
    assert_matches!(result, Err(IngestError::Storage(_)));
    assert_eq!(sink.count(), 0);

    let reopened = SqliteBackend::new(&db_path).await.unwrap();
    assert_eq!(reopened.snapshot_count().await.unwrap(), 0);
    assert_eq!(reopened.alert_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_open_selects_backend() {
    let dir = tempdir().unwrap();
    let sqlite = storage::open(&StorageConfig::Sqlite {
        path: dir.path().join("open.db"),
    })
    .await
    .unwrap();
    assert!(sqlite.get_stats().await.unwrap().starts_with("SQLite"));

    let memory = storage::open(&StorageConfig::None).await.unwrap();
    assert!(memory.get_stats().await.unwrap().starts_with("In-Memory"));
}

#[tokio::test]
async fn test_suppression_uses_persisted_history() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("collector.db");
    let window = Some(chrono::Duration::minutes(30));

    {
        let storage = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
        let ingestor = create_ingestor(
            storage.clone(),
            RecordingSink::new(SinkMode::Accept),
            thresholds(80.0, 80.0, 80.0),
        )
        .with_suppression(window);
        ingestor
            .ingest(&body(&report_at("web-01", "2024-05-01 12:00:00", "90%", &[], &[])))
            .await
            .unwrap();
        storage.close().await.unwrap();
    }

    let storage = Arc::new(SqliteBackend::new(&db_path).await.unwrap());
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0))
        .with_suppression(window);

    let outcome = ingestor
        .ingest(&body(&report_at("web-01", "2024-05-01 12:10:00", "90%", &[], &[])))
        .await
        .unwrap();

    assert_eq!(outcome.suppressed, 1);
    assert_eq!(sink.count(), 0);
    assert_eq!(storage.snapshot_count().await.unwrap(), 2);
}
