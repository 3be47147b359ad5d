use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use crate::alerts::{AlertSink, DispatchError};
use crate::config::Discord;

/// Red
const ALERT_COLOR: u32 = 15158332;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

pub fn build_alert_embed(title: &str, body: &str) -> Embed {
    Embed {
        title: Some(format!("⚠️ {title}")),
        description: Some(body.to_string()),
        color: Some(ALERT_COLOR),
        timestamp: Some(Utc::now().to_rfc3339()),
    }
}

#[derive(Debug, Clone)]
pub struct DiscordSink {
    client: Client,
    discord: Discord,
}

impl DiscordSink {
    pub fn new(client: Client, discord: Discord) -> Self {
        Self { client, discord }
    }

    pub fn build_message(&self, title: &str, body: &str) -> Message {
        let mut message_builder = MessageBuilder::new().add_embed(build_alert_embed(title, body));
        if let Some(user_id) = &self.discord.user_id {
            message_builder = message_builder.content(format!("{title} <@{user_id}>"));
        }
        message_builder.build()
    }
}

#[async_trait]
impl AlertSink for DiscordSink {
    #[instrument(skip(self, body))]
    async fn send(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        let message = self.build_message(title, body);

        let response = self.client.post(&self.discord.url).json(&message).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        info!("Successfully sent Discord message");
        Ok(())
    }
}
