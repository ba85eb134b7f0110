//! OS-level gateway checks and the combined local gateway collaborator

use crate::adapters::GatewayClient;
use crate::config::GatewayConfig;
use crate::domain::{AuthStatus, ProcessStatus};
use crate::error::{KeepaliveError, Result};
use crate::supervisor::GatewayChecks;
use async_trait::async_trait;
use std::time::Duration;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Look for a running process whose name or command line contains `needle`
pub async fn process_status(needle: &str) -> ProcessStatus {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        warn!("Process enumeration not supported on this platform");
        return ProcessStatus::Unknown;
    }

    let needle = needle.to_lowercase();
    let own_pid = std::process::id();
    let scan = tokio::task::spawn_blocking(move || {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::OnlyIfNotSet),
        );
        let found = system.processes().iter().any(|(pid, process)| {
            if pid.as_u32() == own_pid {
                return false;
            }
            let name = process.name().to_string_lossy();
            let cmd: Vec<String> = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            process_matches(&name, &cmd, &needle)
        });
        (found, system.processes().len())
    })
    .await;

    match scan {
        // an empty table means the OS refused to tell us anything
        Ok((_, 0)) => {
            warn!("Process table came back empty, process status unknown");
            ProcessStatus::Unknown
        }
        Ok((true, _)) => ProcessStatus::Alive,
        Ok((false, _)) => ProcessStatus::Absent,
        Err(e) => {
            warn!("Process enumeration failed: {}", e);
            ProcessStatus::Unknown
        }
    }
}

/// Case-insensitive substring match, `needle` already lowercased
pub fn process_matches(name: &str, cmd: &[String], needle: &str) -> bool {
    name.to_lowercase().contains(needle)
        || cmd.iter().any(|arg| arg.to_lowercase().contains(needle))
}

/// Bounded TCP connect to the gateway API socket
pub async fn port_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Connect to {}:{} failed: {}", host, port, e);
            false
        }
        Err(_) => {
            debug!("Connect to {}:{} timed out after {:?}", host, port, timeout);
            false
        }
    }
}

/// The gateway running on this machine
pub struct LocalGateway {
    config: GatewayConfig,
    http: Option<GatewayClient>,
}

impl LocalGateway {
    pub fn new(config: GatewayConfig, http: Option<GatewayClient>) -> Self {
        Self { config, http }
    }
}

#[async_trait]
impl GatewayChecks for LocalGateway {
    async fn process_status(&self) -> ProcessStatus {
        process_status(&self.config.process_name).await
    }

    async fn port_reachable(&self) -> bool {
        port_reachable(
            &self.config.host,
            self.config.port,
            self.config.port_timeout(),
        )
        .await
    }

    fn has_http_api(&self) -> bool {
        self.http.is_some()
    }

    async fn auth_status(&self) -> Result<AuthStatus> {
        match &self.http {
            Some(client) => client.auth_status().await,
            None => Err(KeepaliveError::ProbeUnavailable(
                "gateway HTTP API not configured".to_string(),
            )),
        }
    }

    async fn tickle(&self) -> Result<()> {
        match &self.http {
            Some(client) => client.tickle().await,
            None => Err(KeepaliveError::ProbeUnavailable(
                "gateway HTTP API not configured".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_matches_name_or_cmdline() {
        assert!(process_matches("IBGateway", &[], "ibgateway"));
        assert!(process_matches(
            "java",
            &["java".to_string(), "-jar".to_string(), "/opt/ibgateway/jts.jar".to_string()],
            "ibgateway"
        ));
        assert!(!process_matches("java", &["-version".to_string()], "ibgateway"));
    }

    #[tokio::test]
    async fn test_socket_only_gateway_refuses_tickle() {
        let config = GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 4001,
            process_name: "ibgateway".to_string(),
            base_url: None,
            auth_status_path: "/v1/api/iserver/auth/status".to_string(),
            tickle_path: "/v1/api/tickle".to_string(),
            accept_invalid_certs: true,
            port_timeout_secs: 1,
            http_timeout_secs: 1,
        };
        let gateway = LocalGateway::new(config, None);
        assert!(!gateway.has_http_api());
        assert!(matches!(
            gateway.tickle().await,
            Err(KeepaliveError::ProbeUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_port_reachable_against_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(port_reachable("127.0.0.1", port, Duration::from_secs(1)).await);

        drop(listener);
        assert!(!port_reachable("127.0.0.1", port, Duration::from_secs(1)).await);
    }
}
