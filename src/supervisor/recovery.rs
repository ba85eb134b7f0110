//! Recovery Supervisor
//!
//! One call to [`RecoverySupervisor::run_cycle`] is one scheduler tick:
//! read the last token, probe, act on the transition, write the new token.
//! Nothing but the token crosses invocations, so every cycle can start cold.

use super::alert_manager::Notifier;
use super::login::LoginDriver;
use super::playbook::{RecoveryAction, RecoveryPlaybook};
use super::probe::{GatewayChecks, HealthProbe};
use crate::domain::{Credentials, HealthClassification, ProbeReport, RecoveryAttempt, StateToken};
use crate::error::Result;
use crate::persistence::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a single cycle observed and did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub previous: StateToken,
    pub probe: ProbeReport,
    /// Token written at the end of the cycle
    pub persisted: HealthClassification,
    pub action: RecoveryAction,
    /// Tickle result, when one was sent
    pub tickled: Option<bool>,
    pub relogin: Option<RecoveryAttempt>,
    pub notifications: usize,
}

impl CycleReport {
    pub fn observed(&self) -> HealthClassification {
        self.probe.classification
    }
}

pub struct RecoverySupervisor {
    checks: Arc<dyn GatewayChecks>,
    probe: HealthProbe,
    store: StateStore,
    playbook: RecoveryPlaybook,
    notifier: Arc<dyn Notifier>,
    login: Option<Arc<dyn LoginDriver>>,
    credentials: Option<Credentials>,
}

impl RecoverySupervisor {
    pub fn new(
        checks: Arc<dyn GatewayChecks>,
        store: StateStore,
        playbook: RecoveryPlaybook,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            probe: HealthProbe::new(checks.clone()),
            checks,
            store,
            playbook,
            notifier,
            login: None,
            credentials: None,
        }
    }

    /// Enable automated re-login
    pub fn with_login(
        mut self,
        driver: Arc<dyn LoginDriver>,
        credentials: Option<Credentials>,
    ) -> Self {
        self.login = Some(driver);
        self.credentials = credentials;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Probe only: no alerts, no recovery, no state write
    pub async fn status(&self) -> Result<(StateToken, ProbeReport)> {
        let previous = self.store.read_last().await?;
        Ok((previous, self.probe.probe().await))
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let previous = self.store.read_last().await?;
        let report = self.probe.probe().await;
        let plan = self.playbook.plan(previous, &report);
        let edge = plan.transition.is_edge();

        info!(
            "Gateway {} [{}] {}",
            report.classification,
            plan.transition,
            report.detail()
        );

        let mut notifications = 0;
        if let Some(alert) = &plan.alert {
            self.notifier.notify(alert).await;
            notifications += 1;
        }

        let mut persisted = report.classification;
        let mut tickled = None;
        let mut relogin = None;

        match plan.action {
            RecoveryAction::Tickle => {
                let ok = match self.checks.tickle().await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Tickle failed: {}", e);
                        false
                    }
                };
                tickled = Some(ok);
            }
            RecoveryAction::AttemptRelogin => {
                let attempt = self.attempt_relogin().await;
                for alert in self.playbook.relogin_alerts(edge, &report, &attempt) {
                    self.notifier.notify(&alert).await;
                    notifications += 1;
                }
                match attempt.ensure_authenticated() {
                    Ok(()) => {
                        info!("Session restored after {} polls", attempt.polls);
                        persisted = HealthClassification::Healthy;
                    }
                    Err(e) if edge => warn!("{}", e),
                    Err(e) => warn!("{}, alert already sent", e),
                }
                relogin = Some(attempt);
            }
            RecoveryAction::AwaitExternalRestart => {
                if !edge {
                    debug!("Still {}, alert suppressed", report.classification);
                }
            }
            RecoveryAction::None => {}
        }

        self.store.write_last(persisted.into()).await?;

        Ok(CycleReport {
            previous,
            probe: report,
            persisted,
            action: plan.action,
            tickled,
            relogin,
            notifications,
        })
    }

    async fn attempt_relogin(&self) -> RecoveryAttempt {
        let Some(driver) = &self.login else {
            return RecoveryAttempt::error(
                "browser automation not configured",
                0,
                Duration::ZERO,
            );
        };
        let Some(credentials) = &self.credentials else {
            return RecoveryAttempt::error(
                "no gateway credentials configured",
                0,
                Duration::ZERO,
            );
        };

        info!("Attempting automated login");
        let attempt = driver.attempt_login(credentials).await;
        info!(
            "Automated login finished: {} after {} polls in {:?}",
            attempt.outcome, attempt.polls, attempt.elapsed
        );
        attempt
    }
}
