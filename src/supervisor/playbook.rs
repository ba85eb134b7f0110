//! Recovery Playbook
//!
//! Maps (previous token, current probe) to the action and alert of a cycle.
//! Pure decision logic; the supervisor carries it out.

use super::alert_manager::{Alert, AlertLevel};
use crate::domain::{
    AuthCheck, HealthClassification, ProbeReport, RecoveryAttempt, StateToken, StateTransition,
};

const COMPONENT: &str = "gateway";

/// Recovery actions that can be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Healthy and unchanged: refresh the session expiry
    Tickle,
    /// Session expired with process and port up: replay the login
    AttemptRelogin,
    /// Nothing to talk to; the process supervisor or an operator must act
    AwaitExternalRestart,
    /// Just recovered, nothing to do
    None,
}

/// What one cycle should do before any outcome-dependent alerts
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub transition: StateTransition,
    pub action: RecoveryAction,
    /// Alert to send right away; `AuthExpired` defers its alerts to the
    /// login outcome
    pub alert: Option<Alert>,
}

/// Recovery playbook with predefined responses
#[derive(Debug, Clone)]
pub struct RecoveryPlaybook {
    /// host:port label used in alert texts
    pub endpoint: String,
    pub process_name: String,
}

impl RecoveryPlaybook {
    pub fn new(endpoint: impl Into<String>, process_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            process_name: process_name.into(),
        }
    }

    /// Determine the action and immediate alert for this cycle
    pub fn plan(&self, previous: StateToken, report: &ProbeReport) -> CyclePlan {
        let current = report.classification;
        let transition = StateTransition::new(previous, current);
        let edge = transition.is_edge();

        let (action, alert) = match current {
            HealthClassification::Healthy if edge => (RecoveryAction::None, Some(self.recovered())),
            // socket-only gateway: nothing to tickle
            HealthClassification::Healthy if report.auth == AuthCheck::NotConfigured => {
                (RecoveryAction::None, None)
            }
            HealthClassification::Healthy => (RecoveryAction::Tickle, None),
            c if c.allows_auto_recovery() => (RecoveryAction::AttemptRelogin, None),
            other => (
                RecoveryAction::AwaitExternalRestart,
                edge.then(|| self.degraded(other, report)),
            ),
        };

        CyclePlan {
            transition,
            action,
            alert,
        }
    }

    /// Alerts after a login attempt. `edge` is whether `AuthExpired` was a
    /// fresh transition this cycle.
    pub fn relogin_alerts(&self, edge: bool, report: &ProbeReport, attempt: &RecoveryAttempt) -> Vec<Alert> {
        if attempt.succeeded() {
            return vec![Alert::new(
                AlertLevel::Info,
                COMPONENT,
                "Auto-relogin successful",
                &format!(
                    "Gateway {} session had expired and was restored automatically after {} polls ({}s).",
                    self.endpoint,
                    attempt.polls,
                    attempt.elapsed.as_secs()
                ),
            )];
        }

        if !edge {
            return Vec::new();
        }

        vec![
            self.degraded(HealthClassification::AuthExpired, report),
            Alert::new(
                AlertLevel::Critical,
                COMPONENT,
                "Auto-relogin failed",
                &format!(
                    "Automated login to gateway {} did not restore the session: {}. Manual action required: log in to the gateway.",
                    self.endpoint,
                    attempt.reason()
                ),
            ),
        ]
    }

    fn recovered(&self) -> Alert {
        Alert::new(
            AlertLevel::Info,
            COMPONENT,
            "Gateway recovered",
            &format!(
                "Gateway {} is reachable again. Live data channel restored.",
                self.endpoint
            ),
        )
    }

    fn degraded(&self, classification: HealthClassification, report: &ProbeReport) -> Alert {
        match classification {
            HealthClassification::ProcessDown => Alert::new(
                AlertLevel::Critical,
                COMPONENT,
                "Gateway stopped",
                &format!(
                    "No running process matches '{}'. All live data queries are unavailable. Restart the gateway and log in.",
                    self.process_name
                ),
            ),
            HealthClassification::PortUnreachable => Alert::new(
                AlertLevel::Warning,
                COMPONENT,
                "Gateway port unreachable",
                &format!(
                    "The gateway process is running but {} cannot be reached. Possible causes: not logged in, or still starting. Check the gateway login state.",
                    self.endpoint
                ),
            ),
            HealthClassification::AuthExpired => Alert::new(
                AlertLevel::Error,
                COMPONENT,
                "Gateway session expired",
                &format!(
                    "Gateway {} is up but its session is no longer authenticated ({}).",
                    self.endpoint,
                    auth_detail(report)
                ),
            ),
            HealthClassification::ProbeError => Alert::new(
                AlertLevel::Error,
                COMPONENT,
                "Gateway health check failed",
                &format!(
                    "The auth status endpoint of {} could not be used ({}). The gateway API is probably not running.",
                    self.endpoint,
                    auth_detail(report)
                ),
            ),
            HealthClassification::Healthy => self.recovered(),
        }
    }
}

fn auth_detail(report: &ProbeReport) -> String {
    match &report.auth {
        AuthCheck::Reported(status) => status.detail(),
        AuthCheck::Failed { reason } => reason.clone(),
        AuthCheck::Skipped | AuthCheck::NotConfigured => report.detail(),
    }
}
