use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::{Alert, Webhook};
use crate::discord::DiscordSink;
use crate::feishu::FeishuSink;

/// Failure to deliver a notification
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification timed out after {0:?}")]
    TimedOut(Duration),
}

/// Delivers a rendered alert to a notification target
///
/// Called at most once per triggered alert event; implementations must not retry.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, title: &str, body: &str) -> Result<(), DispatchError>;
}

/// Select the sink for the configured target, or a log-only sink
pub fn build_sink(alert: Option<&Alert>, timeout: Duration) -> anyhow::Result<Arc<dyn AlertSink>> {
    let client = Client::builder().timeout(timeout).build()?;

    let sink: Arc<dyn AlertSink> = match alert {
        Some(Alert::Feishu(feishu)) => Arc::new(FeishuSink::new(client, feishu.clone())),
        Some(Alert::Discord(discord)) => Arc::new(DiscordSink::new(client, discord.clone())),
        Some(Alert::Webhook(webhook)) => Arc::new(WebhookSink::new(client, webhook.clone())),
        None => Arc::new(LogSink),
    };
    Ok(sink)
}

/// Generic JSON webhook: `{"title", "message", "timestamp"}`
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    webhook: Webhook,
}

impl WebhookSink {
    pub fn new(client: Client, webhook: Webhook) -> Self {
        Self { client, webhook }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    #[instrument(skip(self, body))]
    async fn send(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        let payload = json!({
            "title": title,
            "message": body,
            "timestamp": Utc::now().to_rfc3339()
        });

        let response = self.client.post(&self.webhook.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        info!("Successfully sent webhook alert");
        Ok(())
    }
}

/// Used when no notification target is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        warn!("{title}: {body}");
        Ok(())
    }
}
