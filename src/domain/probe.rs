use serde::Deserialize;
use std::fmt;

use super::state::HealthClassification;

/// Result of the OS process enumeration check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Alive,
    Absent,
    /// The OS could not be queried; never treated as down
    Unknown,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Alive => write!(f, "alive"),
            ProcessStatus::Absent => write!(f, "absent"),
            ProcessStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Body of the gateway auth-status endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub competing: bool,
    #[serde(default)]
    pub message: String,
}

impl AuthStatus {
    pub fn detail(&self) -> String {
        let mut parts = vec![
            format!("authenticated={}", self.authenticated),
            format!("connected={}", self.connected),
        ];
        if self.competing {
            parts.push("competing session".to_string());
        }
        if !self.message.is_empty() {
            parts.push(format!("message={}", self.message));
        }
        parts.join(", ")
    }
}

/// Outcome of the auth-status check within a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCheck {
    /// Not evaluated because an earlier check already failed
    Skipped,
    /// Gateway has no HTTP API configured
    NotConfigured,
    Reported(AuthStatus),
    Failed { reason: String },
}

/// Per-check results of one probe, plus the resulting classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub classification: HealthClassification,
    pub process: ProcessStatus,
    /// `None` when the port check was skipped
    pub port_reachable: Option<bool>,
    pub auth: AuthCheck,
}

impl ProbeReport {
    pub fn detail(&self) -> String {
        let port = match self.port_reachable {
            Some(true) => "open",
            Some(false) => "closed",
            None => "skipped",
        };
        let auth = match &self.auth {
            AuthCheck::Skipped => "skipped".to_string(),
            AuthCheck::NotConfigured => "not configured".to_string(),
            AuthCheck::Reported(status) => status.detail(),
            AuthCheck::Failed { reason } => format!("failed ({})", reason),
        };
        format!("process={}, port={}, auth={}", self.process, port, auth)
    }
}
