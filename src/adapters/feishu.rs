//! Feishu (Lark) webhook notifications
//!
//! Sends gateway alerts to a Feishu bot webhook.

use crate::error::{KeepaliveError, Result};
use crate::supervisor::{Alert, NotificationChannel};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Feishu notification client
#[derive(Clone)]
pub struct FeishuNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct FeishuMessage {
    msg_type: String,
    content: FeishuContent,
}

#[derive(Serialize)]
struct FeishuContent {
    text: String,
}

impl FeishuNotifier {
    /// Create a new Feishu notifier with explicit URL
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }

    /// Format for a Feishu text message
    pub fn format(alert: &Alert) -> String {
        format!(
            "{} {}\n\nComponent: {}\nTime: {}\n\n{}",
            alert.level.emoji(),
            alert.title,
            alert.component,
            alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            alert.message
        )
    }

    /// Send a text message to Feishu
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let message = FeishuMessage {
            msg_type: "text".to_string(),
            content: FeishuContent {
                text: text.to_string(),
            },
        };

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| KeepaliveError::NotificationDeliveryFailed {
                channel: "feishu".to_string(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            debug!("Feishu notification sent successfully");
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(KeepaliveError::NotificationDeliveryFailed {
                channel: "feishu".to_string(),
                reason: format!("HTTP {}: {}", status, body),
            })
        }
    }
}

#[async_trait]
impl NotificationChannel for FeishuNotifier {
    fn name(&self) -> &str {
        "feishu"
    }

    async fn send(&self, alert: &Alert) -> Result<()> {
        self.send_message(&Self::format(alert)).await
    }
}
