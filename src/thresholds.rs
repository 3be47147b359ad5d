//! Threshold evaluation for ingested snapshots
//!
//! Every rule is a pure function of the snapshot section and its limit. The three
//! metric kinds are evaluated independently, and so is each mount point: a
//! malformed reading never hides a violation found elsewhere.
//!
//! ```text
//! memory: usage > limit                      → one violation
//! cpu:    any entry usage > limit            → one violation (first violating entry)
//! disk:   each entry with usage > limit      → one violation per mount point
//! ```

use tracing::{instrument, trace};

use crate::{AlertKind, CpuInfo, DiskInfo, MemInfo, MetricSnapshot, config::Thresholds, util};

/// A section whose usage readings could not be interpreted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("{kind} usage is missing{}", describe(.resource))]
    MissingUsage {
        kind: AlertKind,
        resource: Option<String>,
    },

    #[error("{kind} usage {raw:?} is not a percentage{}", describe(.resource))]
    InvalidUsage {
        kind: AlertKind,
        resource: Option<String>,
        raw: String,
    },
}

fn describe(resource: &Option<String>) -> String {
    resource
        .as_ref()
        .map(|resource| format!(" ({resource})"))
        .unwrap_or_default()
}

/// A reading that exceeded its configured limit
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: AlertKind,
    pub resource: Option<String>,
    pub observed: f64,
    pub threshold: f64,
}

impl Violation {
    /// Notification title for this violation
    pub fn title(&self) -> &'static str {
        match self.kind {
            AlertKind::Memory => "Memory usage over limit",
            AlertKind::Cpu => "CPU usage over limit",
            AlertKind::Disk => "Disk usage over limit",
        }
    }

    /// Human-readable description including limit and observed value
    pub fn detail(&self, host_name: &str) -> String {
        let Violation {
            observed,
            threshold,
            ..
        } = self;
        match (self.kind, self.resource.as_deref()) {
            (AlertKind::Memory, _) => format!(
                "memory usage on host {host_name} exceeded {threshold:.2}%, current value: {observed:.2}%"
            ),
            (AlertKind::Cpu, Some(model)) => format!(
                "CPU usage on host {host_name} ({model}) exceeded {threshold:.2}%, current value: {observed:.2}%"
            ),
            (AlertKind::Cpu, None) => format!(
                "CPU usage on host {host_name} exceeded {threshold:.2}%, current value: {observed:.2}%"
            ),
            (AlertKind::Disk, resource) => format!(
                "disk usage of {} on host {host_name} exceeded {threshold:.2}%, current value: {observed:.2}%",
                resource.unwrap_or("unknown mount point")
            ),
        }
    }
}

/// Outcome of evaluating one snapshot, per metric kind
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub memory: Result<Option<Violation>, EvaluationError>,
    pub cpu: Result<Option<Violation>, EvaluationError>,
    pub disk: (Vec<Violation>, Vec<EvaluationError>),
}

impl Evaluation {
    /// Violations of all kinds in memory, cpu, disk order, with the evaluation errors
    pub fn into_parts(self) -> (Vec<Violation>, Vec<EvaluationError>) {
        let mut violations = Vec::new();
        let mut errors = Vec::new();

        match self.memory {
            Ok(violation) => violations.extend(violation),
            Err(e) => errors.push(e),
        }
        match self.cpu {
            Ok(violation) => violations.extend(violation),
            Err(e) => errors.push(e),
        }
        let (found, failed) = self.disk;
        violations.extend(found);
        errors.extend(failed);

        (violations, errors)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator {
    thresholds: Thresholds,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    #[instrument(skip_all, fields(host = %snapshot.host_name))]
    pub fn evaluate(&self, snapshot: &MetricSnapshot) -> Evaluation {
        let evaluation = Evaluation {
            memory: check_memory(&snapshot.mem_info, self.thresholds.memory),
            cpu: check_cpu(&snapshot.cpu_info, self.thresholds.cpu),
            disk: check_disk(&snapshot.disk_info, self.thresholds.disk),
        };
        trace!("evaluation result: {evaluation:?}");
        evaluation
    }
}

fn usage_of(
    kind: AlertKind,
    resource: Option<&str>,
    raw: Option<&str>,
) -> Result<f64, EvaluationError> {
    let resource = resource.map(str::to_string);
    let Some(raw) = raw else {
        return Err(EvaluationError::MissingUsage { kind, resource });
    };
    util::parse_percent(raw).ok_or_else(|| EvaluationError::InvalidUsage {
        kind,
        resource,
        raw: raw.to_string(),
    })
}

/// Memory rule: violation iff usage is strictly above the limit.
pub fn check_memory(mem: &MemInfo, threshold: f64) -> Result<Option<Violation>, EvaluationError> {
    let usage = usage_of(AlertKind::Memory, None, mem.usage.as_deref())?;

    Ok((usage > threshold).then_some(Violation {
        kind: AlertKind::Memory,
        resource: None,
        observed: usage,
        threshold,
    }))
}

/// CPU rule: a single violation for the first entry above the limit.
///
/// Unreadable entries are skipped while scanning; they only surface as an error
/// when no entry violates.
pub fn check_cpu(cpus: &[CpuInfo], threshold: f64) -> Result<Option<Violation>, EvaluationError> {
    let mut first_error = None;

    for cpu in cpus {
        match usage_of(AlertKind::Cpu, cpu.model.as_deref(), cpu.usage.as_deref()) {
            Ok(usage) if usage > threshold => {
                return Ok(Some(Violation {
                    kind: AlertKind::Cpu,
                    resource: cpu.model.clone(),
                    observed: usage,
                    threshold,
                }));
            }
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    first_error.map_or(Ok(None), Err)
}

/// Disk rule: one violation per mount point above the limit.
///
/// Mount points are independent: an unreadable entry yields an error for that
/// mount point only.
pub fn check_disk(disks: &[DiskInfo], threshold: f64) -> (Vec<Violation>, Vec<EvaluationError>) {
    let mut violations = Vec::new();
    let mut errors = Vec::new();

    for disk in disks {
        match usage_of(AlertKind::Disk, Some(&disk.mountpoint), disk.usage.as_deref()) {
            Ok(usage) if usage > threshold => violations.push(Violation {
                kind: AlertKind::Disk,
                resource: Some(disk.mountpoint.clone()),
                observed: usage,
                threshold,
            }),
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
    }

    (violations, errors)
}
