//! Alert Manager
//!
//! Fans alerts out to the configured operator channels. Delivery is best
//! effort: a channel failure is logged and never reaches the caller, and
//! nothing is retried within the same cycle.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertLevel {
    /// Informational (recoveries)
    Info,
    /// Degraded, may resolve on its own
    Warning,
    /// Needs attention
    Error,
    /// Manual intervention required
    Critical,
}

impl AlertLevel {
    /// Get emoji prefix for alert level
    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Info => "\u{2705}",            // check mark
            AlertLevel::Warning => "\u{26a0}\u{fe0f}", // warning icon
            AlertLevel::Error => "\u{274c}",           // red X
            AlertLevel::Critical => "\u{1f6a8}",       // police light
        }
    }

    /// Get severity string
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Alert payload
#[derive(Debug, Clone)]
pub struct Alert {
    pub level: AlertLevel,
    pub component: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create a new alert
    pub fn new(level: AlertLevel, component: &str, title: &str, message: &str) -> Self {
        Self {
            level,
            component: component.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Something that takes alerts and never fails
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert);
}

/// A single delivery transport (Telegram, webhook, ...)
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Alert Manager for coordinating notifications
#[derive(Default)]
pub struct AlertManager {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl AlertManager {
    /// An alert manager with no channels only logs
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        info!("{} notifications enabled", channel.name());
        self.channels.push(channel);
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.channels.is_empty()
    }

    fn log(alert: &Alert) {
        match alert.level {
            AlertLevel::Info => info!("[{}] {}: {}", alert.component, alert.title, alert.message),
            AlertLevel::Warning => {
                warn!("[{}] {}: {}", alert.component, alert.title, alert.message)
            }
            AlertLevel::Error => {
                error!("[{}] {}: {}", alert.component, alert.title, alert.message)
            }
            AlertLevel::Critical => {
                error!(
                    "CRITICAL [{}] {}: {}",
                    alert.component, alert.title, alert.message
                )
            }
        }
    }
}

#[async_trait]
impl Notifier for AlertManager {
    async fn notify(&self, alert: &Alert) {
        Self::log(alert);

        for channel in &self.channels {
            if let Err(e) = channel.send(alert).await {
                error!("Failed to send {} alert: {}", channel.name(), e);
            }
        }
    }
}
