use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;
use tracing::debug;

use crate::constants::TELEGRAM_API_BASE;
use crate::watcher::AlertSink;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram returned HTTP {0}")]
    Status(StatusCode),
    #[error("telegram API error: {0}")]
    Api(String),
}

/// Telegram error bodies carry a human-readable description alongside `ok`.
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self { client, bot_token })
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.bot_token);
        let chat_id_value = chat_id.to_string();

        let response = self
            .client
            .post(&url)
            .form(&[
                ("chat_id", chat_id_value.as_str()),
                ("text", text),
                ("disable_web_page_preview", "true"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|_| NotifyError::Status(status))?;

        if !body.ok {
            return Err(NotifyError::Api(
                body.description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        debug!("Telegram message delivered to chat {}", chat_id);
        Ok(())
    }
}

impl AlertSink for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await?;
        Ok(())
    }
}
