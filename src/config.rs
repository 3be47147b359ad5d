use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./hostwatch.db")
}

/// Collector configuration, read once at startup
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Path agents POST their reports to
    #[serde(default = "default_report_path")]
    pub report_path: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub thresholds: Thresholds,

    /// Notification target (log-only when absent)
    pub alert: Option<Alert>,

    /// Upper bound for a single notification dispatch
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Skip repeated alerts for the same host/kind/resource within this many seconds
    #[serde(default)]
    pub suppression_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            report_path: default_report_path(),
            storage: StorageConfig::default(),
            thresholds: Thresholds::default(),
            alert: None,
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            suppression_secs: None,
        }
    }
}

impl Config {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn suppression_window(&self) -> Option<chrono::Duration> {
        self.suppression_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_report_path() -> String {
    String::from("/alarm")
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

/// Usage limits in percent; a reading must be strictly greater to violate
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_threshold")]
    pub memory: f64,
    #[serde(default = "default_threshold")]
    pub cpu: f64,
    #[serde(default = "default_threshold")]
    pub disk: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            memory: default_threshold(),
            cpu: default_threshold(),
            disk: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    80.0
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Feishu(Feishu),
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Feishu {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

/// Sampling agent configuration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AgentConfig {
    pub host_name: String,
    pub report_url: String,
    /// Seconds between two reports
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

fn default_report_interval() -> u64 {
    60
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

pub fn read_agent_config_file(path: &str) -> anyhow::Result<AgentConfig> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid agent configuration file provided: {e}"))
        .inspect(|config| trace!("loaded agent config: {config:?}"))
}
