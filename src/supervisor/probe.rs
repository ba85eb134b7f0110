//! Health Probe
//!
//! Runs the three gateway checks in a fixed order. Each check only makes
//! sense when the previous one held: there is no port to test without a
//! process, and no session to ask about without an open port.

use crate::domain::{AuthCheck, AuthStatus, HealthClassification, ProbeReport, ProcessStatus};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Application-level authentication status
#[async_trait]
pub trait AuthStatusSource: Send + Sync {
    async fn auth_status(&self) -> Result<AuthStatus>;
}

/// Everything the supervisor needs to know about the gateway
#[async_trait]
pub trait GatewayChecks: Send + Sync {
    async fn process_status(&self) -> ProcessStatus;

    async fn port_reachable(&self) -> bool;

    /// False for socket-only gateways: no auth check, tickle, or re-login
    fn has_http_api(&self) -> bool;

    async fn auth_status(&self) -> Result<AuthStatus>;

    async fn tickle(&self) -> Result<()>;
}

pub struct HealthProbe {
    checks: Arc<dyn GatewayChecks>,
}

impl HealthProbe {
    pub fn new(checks: Arc<dyn GatewayChecks>) -> Self {
        Self { checks }
    }

    pub async fn probe(&self) -> ProbeReport {
        let process = self.checks.process_status().await;
        if process == ProcessStatus::Absent {
            return ProbeReport {
                classification: HealthClassification::ProcessDown,
                process,
                port_reachable: None,
                auth: AuthCheck::Skipped,
            };
        }
        if process == ProcessStatus::Unknown {
            warn!("Gateway process status unknown, continuing with port check");
        }

        if !self.checks.port_reachable().await {
            return ProbeReport {
                classification: HealthClassification::PortUnreachable,
                process,
                port_reachable: Some(false),
                auth: AuthCheck::Skipped,
            };
        }

        if !self.checks.has_http_api() {
            debug!("No gateway HTTP API configured, port check is authoritative");
            return ProbeReport {
                classification: HealthClassification::Healthy,
                process,
                port_reachable: Some(true),
                auth: AuthCheck::NotConfigured,
            };
        }

        let (classification, auth) = match self.checks.auth_status().await {
            Ok(status) if status.authenticated => {
                (HealthClassification::Healthy, AuthCheck::Reported(status))
            }
            Ok(status) => {
                info!("Gateway reports unauthenticated session: {}", status.detail());
                (HealthClassification::AuthExpired, AuthCheck::Reported(status))
            }
            Err(e) => {
                warn!("Auth status check failed: {}", e);
                (
                    HealthClassification::ProbeError,
                    AuthCheck::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        };

        ProbeReport {
            classification,
            process,
            port_reachable: Some(true),
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeepaliveError;
    use mockall::mock;

    mock! {
        Gateway {}

        #[async_trait]
        impl GatewayChecks for Gateway {
            async fn process_status(&self) -> ProcessStatus;
            async fn port_reachable(&self) -> bool;
            fn has_http_api(&self) -> bool;
            async fn auth_status(&self) -> Result<AuthStatus>;
            async fn tickle(&self) -> Result<()>;
        }
    }

    fn authenticated(flag: bool) -> AuthStatus {
        AuthStatus {
            authenticated: flag,
            connected: true,
            ..Default::default()
        }
    }

    async fn probe(gateway: MockGateway) -> ProbeReport {
        HealthProbe::new(Arc::new(gateway)).probe().await
    }

    #[tokio::test]
    async fn test_absent_process_skips_port_and_auth() {
        let mut gw = MockGateway::new();
        gw.expect_process_status().return_const(ProcessStatus::Absent);
        gw.expect_port_reachable().never();
        gw.expect_auth_status().never();

        let report = probe(gw).await;
        assert_eq!(report.classification, HealthClassification::ProcessDown);
        assert_eq!(report.port_reachable, None);
    }

    #[tokio::test]
    async fn test_closed_port_skips_auth() {
        let mut gw = MockGateway::new();
        gw.expect_process_status().return_const(ProcessStatus::Alive);
        gw.expect_port_reachable().return_const(false);
        gw.expect_auth_status().never();

        let report = probe(gw).await;
        assert_eq!(report.classification, HealthClassification::PortUnreachable);
        assert_eq!(report.auth, AuthCheck::Skipped);
    }

    #[tokio::test]
    async fn test_unknown_process_still_checks_port() {
        let mut gw = MockGateway::new();
        gw.expect_process_status().return_const(ProcessStatus::Unknown);
        gw.expect_port_reachable().times(1).return_const(true);
        gw.expect_has_http_api().return_const(true);
        gw.expect_auth_status()
            .returning(|| Ok(authenticated(true)));

        let report = probe(gw).await;
        assert_eq!(report.classification, HealthClassification::Healthy);
        assert_eq!(report.process, ProcessStatus::Unknown);
    }

    #[tokio::test]
    async fn test_unauthenticated_is_auth_expired() {
        let mut gw = MockGateway::new();
        gw.expect_process_status().return_const(ProcessStatus::Alive);
        gw.expect_port_reachable().return_const(true);
        gw.expect_has_http_api().return_const(true);
        gw.expect_auth_status()
            .returning(|| Ok(authenticated(false)));

        let report = probe(gw).await;
        assert_eq!(report.classification, HealthClassification::AuthExpired);
    }

    #[tokio::test]
    async fn test_refused_auth_endpoint_is_probe_error() {
        let mut gw = MockGateway::new();
        gw.expect_process_status().return_const(ProcessStatus::Alive);
        gw.expect_port_reachable().return_const(true);
        gw.expect_has_http_api().return_const(true);
        gw.expect_auth_status().returning(|| {
            Err(KeepaliveError::ProbeUnavailable(
                "connection refused (https://localhost:5000/)".to_string(),
            ))
        });

        let report = probe(gw).await;
        assert_eq!(report.classification, HealthClassification::ProbeError);
        assert!(matches!(report.auth, AuthCheck::Failed { .. }));
    }

    #[tokio::test]
    async fn test_socket_only_gateway_is_healthy_on_open_port() {
        let mut gw = MockGateway::new();
        gw.expect_process_status().return_const(ProcessStatus::Alive);
        gw.expect_port_reachable().return_const(true);
        gw.expect_has_http_api().return_const(false);
        gw.expect_auth_status().never();

        let report = probe(gw).await;
        assert_eq!(report.classification, HealthClassification::Healthy);
        assert_eq!(report.auth, AuthCheck::NotConfigured);
    }
}
