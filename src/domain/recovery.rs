use crate::error::{KeepaliveError, Result};
use std::fmt;
use std::time::Duration;

/// Outcome of one automated login run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Success,
    /// Form submitted but the session never reported authenticated
    Timeout,
    Error,
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryOutcome::Success => write!(f, "success"),
            RecoveryOutcome::Timeout => write!(f, "timeout"),
            RecoveryOutcome::Error => write!(f, "error"),
        }
    }
}

/// Ephemeral record of a single login-automation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAttempt {
    pub outcome: RecoveryOutcome,
    /// Auth-status polls performed after the form was submitted
    pub polls: u32,
    pub elapsed: Duration,
    pub detail: Option<String>,
}

impl RecoveryAttempt {
    pub fn success(polls: u32, elapsed: Duration) -> Self {
        Self {
            outcome: RecoveryOutcome::Success,
            polls,
            elapsed,
            detail: None,
        }
    }

    pub fn timeout(polls: u32, elapsed: Duration) -> Self {
        Self {
            outcome: RecoveryOutcome::Timeout,
            polls,
            elapsed,
            detail: Some(format!(
                "session not authenticated after {} polls ({}s)",
                polls,
                elapsed.as_secs()
            )),
        }
    }

    pub fn error(reason: impl Into<String>, polls: u32, elapsed: Duration) -> Self {
        Self {
            outcome: RecoveryOutcome::Error,
            polls,
            elapsed,
            detail: Some(reason.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == RecoveryOutcome::Success
    }

    /// `AuthRecoveryFailed` unless the session came back
    pub fn ensure_authenticated(&self) -> Result<()> {
        if self.succeeded() {
            Ok(())
        } else {
            Err(KeepaliveError::AuthRecoveryFailed(self.reason()))
        }
    }

    /// Human readable reason, used in the failure notification
    pub fn reason(&self) -> String {
        self.detail
            .clone()
            .unwrap_or_else(|| self.outcome.to_string())
    }
}
