use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::types::Delivery;

/// Outbound channel for composed messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one message. Failures are reported, never retried.
    async fn deliver(&self, text: &str) -> Delivery;
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    async fn deliver(&self, text: &str) -> Delivery {
        (**self).deliver(text).await
    }
}

/// Telegram Bot API `sendMessage` with HTML parse mode.
pub struct TelegramSink {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramReply<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

impl TelegramSink {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Check the bot token with `getMe`, returning the bot's username.
    pub async fn bot_username(&self) -> Result<String> {
        let reply: TelegramReply<BotUser> = self
            .http
            .get(self.method_url("getMe"))
            .send()
            .await?
            .json()
            .await
            .context("unexpected getMe response")?;
        if !reply.ok {
            bail!(
                "getMe rejected: {}",
                reply.description.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(reply
            .result
            .and_then(|u| u.username)
            .unwrap_or_default())
    }

    async fn send(&self, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .form(&[
                ("chat_id", self.chat_id.as_str()),
                ("text", text),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("HTTP {status}: {body}");
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn deliver(&self, text: &str) -> Delivery {
        match self.send(text).await {
            Ok(()) => {
                info!("Message sent to Telegram");
                Delivery::Sent
            }
            Err(e) => {
                warn!("Telegram delivery failed: {e:#}");
                Delivery::Failed(format!("{e:#}"))
            }
        }
    }
}

/// Logs messages instead of sending them.
pub struct DryRunSink;

#[async_trait]
impl NotificationSink for DryRunSink {
    async fn deliver(&self, text: &str) -> Delivery {
        info!("[dry-run] would send:\n{text}");
        Delivery::Skipped
    }
}
