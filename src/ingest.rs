//! Ingestion of agent reports
//!
//! Each report goes through the same phases, each gating the next:
//!
//! ```text
//! parse/validate ──► assign id ──► persist snapshot ──► evaluate ──► record + dispatch
//!      │                                 │                  │              │
//!  ValidationError                 StorageError       logged only     logged only
//! ```
//!
//! Only the first three phases decide the caller's result. Once the snapshot is
//! stored, alert evaluation, alert persistence and notification dispatch are
//! best-effort side effects: their failures are logged and never retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::{
    AlertEvent, MetricSnapshot, SnapshotId,
    alerts::{AlertSink, DispatchError},
    config::{Config, Thresholds},
    storage::{AlertLog, ReportStore, StorageBackend, StorageError},
    thresholds::{ThresholdEvaluator, Violation},
};

/// A report that does not have the snapshot shape
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed report: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("host name must not be empty")]
    EmptyHostName,
}

/// Failures visible to the reporting agent
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to persist snapshot: {0}")]
    Storage(#[from] StorageError),
}

/// What happened to one accepted report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub snapshot_id: SnapshotId,
    /// Violations found by the evaluator
    pub violations: usize,
    /// Alert events successfully written
    pub recorded: usize,
    /// Notifications successfully delivered
    pub dispatched: usize,
    /// Violations skipped by the suppression window
    pub suppressed: usize,
}

/// Parse a raw report body into a validated snapshot
pub fn parse_report(body: &[u8]) -> Result<MetricSnapshot, ValidationError> {
    let snapshot: MetricSnapshot = serde_json::from_slice(body)?;
    if snapshot.host_name.trim().is_empty() {
        return Err(ValidationError::EmptyHostName);
    }
    Ok(snapshot)
}

/// Orchestrates persistence, evaluation and alerting for each report
///
/// Holds no mutable state; one instance is shared by all request tasks.
#[derive(Clone)]
pub struct Ingestor {
    storage: Arc<dyn StorageBackend>,
    sink: Arc<dyn AlertSink>,
    evaluator: ThresholdEvaluator,
    dispatch_timeout: Duration,
    suppression: Option<chrono::Duration>,
}

impl Ingestor {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        sink: Arc<dyn AlertSink>,
        thresholds: Thresholds,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            sink,
            evaluator: ThresholdEvaluator::new(thresholds),
            dispatch_timeout,
            suppression: None,
        }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn StorageBackend>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self::new(storage, sink, config.thresholds, config.dispatch_timeout())
            .with_suppression(config.suppression_window())
    }

    /// Skip alerts whose host/kind/resource already fired within `window`
    pub fn with_suppression(mut self, window: Option<chrono::Duration>) -> Self {
        self.suppression = window;
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Ingest a raw JSON report
    pub async fn ingest(&self, body: &[u8]) -> Result<IngestOutcome, IngestError> {
        let snapshot = parse_report(body).inspect_err(|e| debug!("rejected report: {e}"))?;
        self.ingest_snapshot(snapshot).await
    }

    /// Ingest an already parsed snapshot
    #[instrument(skip_all, fields(host = %snapshot.host_name))]
    pub async fn ingest_snapshot(
        &self,
        mut snapshot: MetricSnapshot,
    ) -> Result<IngestOutcome, IngestError> {
        let snapshot_id = *snapshot.id.get_or_insert_with(Uuid::now_v7);

        let snapshot_id = self.storage.save(&snapshot).await.inspect_err(|e| {
            error!("failed to persist snapshot {snapshot_id}: {e}");
        })?;
        snapshot.id = Some(snapshot_id);
        trace!("persisted snapshot {snapshot_id}");

        let (violations, errors) = self.evaluator.evaluate(&snapshot).into_parts();
        for e in &errors {
            warn!("skipping evaluation for snapshot {snapshot_id}: {e}");
        }

        let mut outcome = IngestOutcome {
            snapshot_id,
            violations: violations.len(),
            recorded: 0,
            dispatched: 0,
            suppressed: 0,
        };

        for violation in violations {
            self.raise(&snapshot, snapshot_id, violation, &mut outcome)
                .await;
        }

        if outcome.violations > 0 {
            info!(
                "snapshot {snapshot_id}: {} violations, {} recorded, {} dispatched, {} suppressed",
                outcome.violations, outcome.recorded, outcome.dispatched, outcome.suppressed
            );
        }

        Ok(outcome)
    }

    async fn raise(
        &self,
        snapshot: &MetricSnapshot,
        snapshot_id: SnapshotId,
        violation: Violation,
        outcome: &mut IngestOutcome,
    ) {
        if self.is_suppressed(snapshot, &violation).await {
            debug!(
                "suppressing {} alert for {} ({:?})",
                violation.kind, snapshot.host_name, violation.resource
            );
            outcome.suppressed += 1;
            return;
        }

        let event = AlertEvent {
            id: Uuid::now_v7(),
            snapshot_id,
            host_name: snapshot.host_name.clone(),
            kind: violation.kind,
            resource: violation.resource.clone(),
            detail: violation.detail(&snapshot.host_name),
            triggered_at: snapshot.captured_at,
        };

        match self.storage.record(&event).await {
            Ok(_) => outcome.recorded += 1,
            Err(e) => error!("failed to record {} alert {}: {e}", event.kind, event.id),
        }

        match self.dispatch(violation.title(), &event.detail).await {
            Ok(()) => outcome.dispatched += 1,
            Err(e) => error!("failed to dispatch {} alert {}: {e}", event.kind, event.id),
        }
    }

    async fn is_suppressed(&self, snapshot: &MetricSnapshot, violation: &Violation) -> bool {
        let Some(window) = self.suppression else {
            return false;
        };

        let last = self
            .storage
            .last_triggered(
                &snapshot.host_name,
                violation.kind,
                violation.resource.as_deref(),
            )
            .await;

        match last {
            Ok(Some(last)) => (snapshot.captured_at - last).abs() < window,
            Ok(None) => false,
            Err(e) => {
                warn!("suppression lookup failed, alerting anyway: {e}");
                false
            }
        }
    }

    async fn dispatch(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        tokio::time::timeout(self.dispatch_timeout, self.sink.send(title, body))
            .await
            .map_err(|_| DispatchError::TimedOut(self.dispatch_timeout))?
    }
}
