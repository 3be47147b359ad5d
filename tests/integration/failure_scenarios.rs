//! Integration tests for failure handling
//!
//! These tests verify that:
//! - Rejected reports leave no trace in storage and trigger no dispatch
//! - A failed snapshot write fails the request with nothing dispatched
//! - Alert persistence and dispatch failures never fail the request
//! - One unparseable metric kind does not block the others

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use assert_matches::assert_matches;
use chrono::Duration;
use hostwatch::{
    AlertKind,
    ingest::{IngestError, ValidationError},
    storage::{AlertLog, ReportStore, StorageError, memory::MemoryBackend},
};
use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn test_malformed_reports_are_rejected_without_side_effects() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let mut missing_memory = report("web-01", "90%", &[], &[]);
    missing_memory.as_object_mut().unwrap().remove("内存信息");

    let bodies = vec![
        b"{not json".to_vec(),
        b"[]".to_vec(),
        body(&missing_memory),
        body(&json!({"主机名称": "web-01", "当前时间": "yesterday",
            "内存信息": {}, "CPU信息": [], "磁盘信息": []})),
        body(&report("", "90%", &[], &[])),
    ];

    for raw in bodies {
        let result = ingestor.ingest(&raw).await;
        assert_matches!(result, Err(IngestError::Validation(_)));
    }

    assert_eq!(storage.snapshot_count().await.unwrap(), 0);
    assert_eq!(storage.alert_count().await.unwrap(), 0);
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_blank_host_name_is_a_validation_error() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage, sink, thresholds(80.0, 80.0, 80.0));

    let result = ingestor.ingest(&body(&report("   ", "10%", &[], &[]))).await;
    assert_matches!(
        result,
        Err(IngestError::Validation(ValidationError::EmptyHostName))
    );
}

#[tokio::test]
async fn test_unreachable_storage_fails_without_dispatch() {
    let storage = FlakyBackend::new();
    storage.fail_save.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let result = ingestor
        .ingest(&body(&report("web-01", "99%", &["99%"], &[("/", "99%")])))
        .await;

    assert_matches!(
        result,
        Err(IngestError::Storage(StorageError::Unavailable(_)))
    );
    assert_eq!(storage.save_attempts.load(Ordering::SeqCst), 1);
    assert_eq!(storage.snapshot_count().await.unwrap(), 0);
    assert_eq!(storage.alert_count().await.unwrap(), 0);
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_alert_record_failure_still_dispatches() {
    let storage = FlakyBackend::new();
    storage.fail_record.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let outcome = ingestor
        .ingest(&body(&report("web-01", "90%", &[], &[("/", "90%")])))
        .await
        .unwrap();

    assert_eq!(outcome.violations, 2);
    assert_eq!(outcome.recorded, 0);
    assert_eq!(outcome.dispatched, 2);
    assert_eq!(storage.snapshot_count().await.unwrap(), 1);
    assert_eq!(sink.count(), 2);
}

#[tokio::test]
async fn test_dispatch_failure_keeps_alert_and_snapshot() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Fail);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let outcome = ingestor
        .ingest(&body(&report("web-01", "90%", &[], &[("/", "90%")])))
        .await
        .unwrap();

    assert_eq!(outcome.recorded, 2);
    assert_eq!(outcome.dispatched, 0);
    assert_eq!(sink.count(), 2);
    assert_eq!(
        storage.alerts_for_snapshot(outcome.snapshot_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_hanging_sink_is_bounded_by_timeout() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Hang);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let started = Instant::now();
    let outcome = ingestor
        .ingest(&body(&report("web-01", "90%", &[], &[])))
        .await
        .unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(outcome.recorded, 1);
    assert_eq!(outcome.dispatched, 0);
}

#[tokio::test]
async fn test_unparseable_readings_do_not_hide_violations() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let outcome = ingestor
        .ingest(&body(&report(
            "web-01",
            "not-a-number",
            &["n/a", "95%"],
            &[("/", "95%"), ("/broken", "n/a"), ("/data", "85%")],
        )))
        .await
        .unwrap();

    // memory is unreadable; the cpu and the two readable full mounts still alert
    let alerts = storage.alerts_for_snapshot(outcome.snapshot_id).await.unwrap();
    let raised: Vec<(AlertKind, Option<&str>)> = alerts
        .iter()
        .map(|alert| (alert.kind, alert.resource.as_deref()))
        .collect();
    assert_eq!(
        raised,
        vec![
            (AlertKind::Cpu, Some("cpu-model-1")),
            (AlertKind::Disk, Some("/")),
            (AlertKind::Disk, Some("/data")),
        ]
    );
    assert_eq!(sink.count(), 3);
}

#[tokio::test]
async fn test_first_alert_write_failure_does_not_block_later_violations() {
    let storage = FlakyBackend::new();
    storage.failing_records.store(1, Ordering::SeqCst);
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let outcome = ingestor
        .ingest(&body(&report(
            "web-01",
            "90%",
            &["90%"],
            &[("/", "90%"), ("/var", "90%")],
        )))
        .await
        .unwrap();

    assert_eq!(outcome.violations, 4);
    assert_eq!(outcome.recorded, 3);
    assert_eq!(outcome.dispatched, 4);
    assert_eq!(sink.titles()[0], "Memory usage over limit");

    let kinds: Vec<AlertKind> = storage
        .alerts_for_snapshot(outcome.snapshot_id)
        .await
        .unwrap()
        .into_iter()
        .map(|alert| alert.kind)
        .collect();
    assert_eq!(kinds, vec![AlertKind::Cpu, AlertKind::Disk, AlertKind::Disk]);
}

#[tokio::test]
async fn test_missing_usage_is_not_a_violation() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0));

    let mut value = report("web-01", "90%", &[], &[]);
    value["内存信息"] = json!({"总量": "16.00G"});

    let outcome = ingestor.ingest(&body(&value)).await.unwrap();
    assert_eq!(outcome.violations, 0);
    assert_eq!(storage.snapshot_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_suppression_lookup_still_alerts() {
    let storage = FlakyBackend::new();
    storage.fail_lookup.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink.clone(), thresholds(80.0, 80.0, 80.0))
        .with_suppression(Some(Duration::hours(1)));

    for _ in 0..2 {
        ingestor
            .ingest(&body(&report("web-01", "90%", &[], &[])))
            .await
            .unwrap();
    }

    assert_eq!(sink.count(), 2);
}
