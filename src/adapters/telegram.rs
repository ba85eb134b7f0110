//! Telegram Bot API notifications

use crate::error::{KeepaliveError, Result};
use crate::supervisor::{Alert, NotificationChannel};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram bot client posting to a single chat
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API, bot_token, chat_id, timeout)
    }

    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// HTML message body; alert text is escaped
    pub fn format(alert: &Alert) -> String {
        format!(
            "{} <b>{}</b>\n{}",
            alert.level.emoji(),
            escape_html(&alert.title),
            escape_html(&alert.message)
        )
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        // the token is part of the path; keep it out of error messages
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| KeepaliveError::NotificationDeliveryFailed {
                channel: "telegram".to_string(),
                reason: e.without_url().to_string(),
            })?;

        if resp.status().is_success() {
            debug!("Telegram notification sent");
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(KeepaliveError::NotificationDeliveryFailed {
                channel: "telegram".to_string(),
                reason: format!("HTTP {}: {}", status, body),
            })
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        self.send_message(&Self::format(alert)).await
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
