//! Feishu custom-bot webhook rendered as a rich-text `post` message

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::alerts::{AlertSink, DispatchError};
use crate::config::Feishu;
use crate::timestamp;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub msg_type: &'static str,
    pub content: Content,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub post: Post,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub zh_cn: RichText,
}

#[derive(Debug, Clone, Serialize)]
pub struct RichText {
    pub title: String,
    /// Paragraphs, each a row of inline elements
    pub content: Vec<Vec<Element>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub tag: &'static str,
    pub text: String,
}

impl Element {
    fn text(text: impl ToString) -> Self {
        Self {
            tag: "text",
            text: text.to_string(),
        }
    }
}

/// The bot answers HTTP 200 even for rejected messages; `code` carries the verdict
#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Build a `post` message with the trigger time followed by the alert body
pub fn build_message(title: &str, body: &str, triggered: &str) -> Message {
    Message {
        msg_type: "post",
        content: Content {
            post: Post {
                zh_cn: RichText {
                    title: title.to_string(),
                    content: vec![vec![
                        Element::text("Triggered at: "),
                        Element::text(format!("{triggered}\n")),
                        Element::text(body),
                    ]],
                },
            },
        },
    }
}

#[derive(Debug, Clone)]
pub struct FeishuSink {
    client: Client,
    feishu: Feishu,
}

impl FeishuSink {
    pub fn new(client: Client, feishu: Feishu) -> Self {
        Self { client, feishu }
    }
}

#[async_trait]
impl AlertSink for FeishuSink {
    #[instrument(skip(self, body))]
    async fn send(&self, title: &str, body: &str) -> Result<(), DispatchError> {
        let triggered = timestamp::format(&Local::now().naive_local());
        let message = build_message(title, body, &triggered);

        let response = self.client.post(&self.feishu.url).json(&message).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        if let Ok(reply) = serde_json::from_str::<Reply>(&text) {
            if reply.code != 0 {
                return Err(DispatchError::Rejected {
                    status: status.as_u16(),
                    body: format!("code {}: {}", reply.code, reply.msg),
                });
            }
        }

        info!("Successfully sent Feishu message");
        Ok(())
    }
}
