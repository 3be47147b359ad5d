pub mod alerts;
pub mod api;
pub mod config;
pub mod discord;
pub mod feishu;
pub mod ingest;
pub mod sampler;
pub mod storage;
pub mod thresholds;
pub mod util;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a persisted [`MetricSnapshot`].
pub type SnapshotId = Uuid;

/// Identifier of a persisted [`AlertEvent`].
pub type AlertId = Uuid;

/// One observation from one host at one point in time.
///
/// Field names on the wire are the human-language labels the sampling agent emits.
/// Nested sections may arrive either as native JSON or as a JSON string containing
/// the section (the agent double-encodes them); both forms are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SnapshotId>,

    #[serde(rename = "主机名称")]
    pub host_name: String,

    /// Agent-side capture time, second precision
    #[serde(rename = "当前时间", with = "timestamp")]
    pub captured_at: NaiveDateTime,

    #[serde(rename = "主机信息", default, with = "embedded")]
    pub host_info: HostInfo,

    #[serde(rename = "内存信息", with = "embedded")]
    pub mem_info: MemInfo,

    #[serde(rename = "CPU信息", with = "embedded")]
    pub cpu_info: Vec<CpuInfo>,

    #[serde(rename = "磁盘信息", with = "embedded")]
    pub disk_info: Vec<DiskInfo>,

    #[serde(rename = "磁盘I/O信息", default, with = "embedded")]
    pub disk_io_info: Vec<DiskIoInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    #[serde(rename = "主机名称", default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(rename = "系统", default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(rename = "平台", default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(rename = "内核", default, skip_serializing_if = "Option::is_none")]
    pub kernel_arch: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemInfo {
    #[serde(rename = "总量", default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(rename = "可用", default, skip_serializing_if = "Option::is_none")]
    pub available: Option<String>,
    #[serde(rename = "已使用", default, skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
    #[serde(rename = "空闲", default, skip_serializing_if = "Option::is_none")]
    pub free: Option<String>,
    /// Usage with a trailing `%`, e.g. `"85.00%"`
    #[serde(rename = "使用率", default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// One group of identical cores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    #[serde(rename = "型号", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "数量", default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<String>,
    #[serde(rename = "使用率", default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    #[serde(rename = "挂载点")]
    pub mountpoint: String,
    #[serde(rename = "总量", default, skip_serializing_if = "Option::is_none")]
    pub total: Option<String>,
    #[serde(rename = "空闲", default, skip_serializing_if = "Option::is_none")]
    pub free: Option<String>,
    #[serde(rename = "已使用", default, skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
    #[serde(rename = "使用率", default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskIoInfo {
    #[serde(rename = "磁盘")]
    pub device: String,
    #[serde(rename = "读次数", default, skip_serializing_if = "Option::is_none")]
    pub read_count: Option<String>,
    #[serde(rename = "写次数", default, skip_serializing_if = "Option::is_none")]
    pub write_count: Option<String>,
    #[serde(rename = "读字节数", default, skip_serializing_if = "Option::is_none")]
    pub read_bytes: Option<String>,
    #[serde(rename = "写字节数", default, skip_serializing_if = "Option::is_none")]
    pub write_bytes: Option<String>,
    #[serde(rename = "读时间", default, skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(rename = "写时间", default, skip_serializing_if = "Option::is_none")]
    pub write_time: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Metric family an alert was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Memory,
    Cpu,
    Disk,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Memory => "memory",
            AlertKind::Cpu => "cpu",
            AlertKind::Disk => "disk",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(AlertKind::Memory),
            "cpu" => Ok(AlertKind::Cpu),
            "disk" => Ok(AlertKind::Disk),
            other => Err(format!("unknown alert kind: {other}")),
        }
    }
}

/// One recorded threshold violation, tied to the snapshot that caused it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: AlertId,
    pub snapshot_id: SnapshotId,
    pub host_name: String,
    pub kind: AlertKind,
    /// Mount point for disk alerts, CPU model for CPU alerts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub detail: String,
    /// Copied from the snapshot's `captured_at`
    #[serde(with = "timestamp")]
    pub triggered_at: NaiveDateTime,
}

/// `YYYY-MM-DD HH:MM:SS` timestamps as produced by the sampling agent.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// Nested sections that may be sent either natively or as an embedded JSON string.
mod embedded {
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{DeserializeOwned, Error},
    };

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Embedded<T> {
        Encoded(String),
        Native(T),
    }

    pub fn serialize<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        match Embedded::<T>::deserialize(deserializer)? {
            Embedded::Native(value) => Ok(value),
            Embedded::Encoded(raw) => serde_json::from_str(&raw).map_err(D::Error::custom),
        }
    }
}
