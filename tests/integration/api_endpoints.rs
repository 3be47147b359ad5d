//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Accepted reports answer 200 with an empty body
//! - Rejected reports answer 400/500 and leave storage untouched
//! - Snapshot and alert lookups return what ingestion stored
//! - Health reflects the storage backend

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use hostwatch::{
    api::{AlertsResponse, HealthResponse},
    storage::{AlertLog, ReportStore, StorageBackend, memory::MemoryBackend},
};
use serde_json::Value;
use uuid::Uuid;

use crate::helpers::*;

async fn post_report(addr: std::net::SocketAddr, body: Vec<u8>) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/alarm"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_accepted_report_returns_empty_200() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let addr = spawn_collector(create_ingestor(
        storage.clone(),
        sink.clone(),
        thresholds(80.0, 80.0, 80.0),
    ))
    .await;

    let response = post_report(addr, body(&report("web-01", "85.00%", &[], &[]))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "");
    assert_eq!(storage.snapshot_count().await.unwrap(), 1);
    assert_eq!(storage.alert_count().await.unwrap(), 1);
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_dispatch_failure_still_returns_200() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Fail);
    let addr = spawn_collector(create_ingestor(
        storage.clone(),
        sink.clone(),
        thresholds(80.0, 80.0, 80.0),
    ))
    .await;

    let response = post_report(addr, body(&report("web-01", "85.00%", &[], &[]))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn test_malformed_report_returns_400() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let addr = spawn_collector(create_ingestor(
        storage.clone(),
        sink.clone(),
        thresholds(80.0, 80.0, 80.0),
    ))
    .await;

    let response = post_report(addr, "{\"主机名称\": ".as_bytes().to_vec()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = response.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("malformed report"));

    assert_eq!(storage.snapshot_count().await.unwrap(), 0);
    assert_eq!(storage.alert_count().await.unwrap(), 0);
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_unreachable_storage_returns_500() {
    let storage = FlakyBackend::new();
    storage.fail_save.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new(SinkMode::Accept);
    let addr = spawn_collector(create_ingestor(
        storage.clone(),
        sink.clone(),
        thresholds(80.0, 80.0, 80.0),
    ))
    .await;

    let response = post_report(addr, body(&report("web-01", "99%", &[], &[("/", "99%")]))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(storage.snapshot_count().await.unwrap(), 0);
    assert_eq!(storage.alert_count().await.unwrap(), 0);
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn test_wrong_method_returns_405() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let addr = spawn_collector(create_ingestor(storage, sink, thresholds(80.0, 80.0, 80.0))).await;

    let response = reqwest::get(format!("http://{addr}/alarm")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_snapshot_lookup() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let ingestor = create_ingestor(storage.clone(), sink, thresholds(80.0, 80.0, 70.0));
    let outcome = ingestor
        .ingest(&body(&report("db-01", "10%", &[], &[("/data", "90%"), ("/", "50%")])))
        .await
        .unwrap();
    let addr = spawn_collector(ingestor).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/snapshots/{}", outcome.snapshot_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["主机名称"], "db-01");
    assert_eq!(json["磁盘信息"][0]["挂载点"], "/data");

    let response = reqwest::get(format!(
        "http://{addr}/api/v1/snapshots/{}/alerts",
        outcome.snapshot_id
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let alerts: AlertsResponse = response.json().await.unwrap();
    assert_eq!(alerts.snapshot_id, outcome.snapshot_id);
    assert_eq!(alerts.count, 1);
    assert_eq!(alerts.alerts[0].resource.as_deref(), Some("/data"));
}

#[tokio::test]
async fn test_snapshot_lookup_errors() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let addr = spawn_collector(create_ingestor(storage, sink, thresholds(80.0, 80.0, 80.0))).await;

    let response = reqwest::get(format!("http://{addr}/api/v1/snapshots/{}", Uuid::now_v7()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = reqwest::get(format!(
        "http://{addr}/api/v1/snapshots/{}/alerts",
        Uuid::now_v7()
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = reqwest::get(format!("http://{addr}/api/v1/snapshots/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reflects_storage() {
    let storage = Arc::new(MemoryBackend::new());
    let sink = RecordingSink::new(SinkMode::Accept);
    let addr = spawn_collector(create_ingestor(
        storage.clone(),
        sink,
        thresholds(80.0, 80.0, 80.0),
    ))
    .await;

    let health: HealthResponse = reqwest::get(format!("http://{addr}/api/v1/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "ok");

    storage.close().await.unwrap();

    let health: HealthResponse = reqwest::get(format!("http://{addr}/api/v1/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "degraded");
}
