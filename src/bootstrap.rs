//! Wires configuration into a ready-to-run supervisor

use crate::adapters::{FeishuNotifier, GatewayClient, LocalGateway, TelegramNotifier, WebDriverBrowser};
use crate::config::AppConfig;
use crate::error::Result;
use crate::persistence::StateStore;
use crate::supervisor::{
    AlertManager, BrowserLoginDriver, LoginBudget, RecoveryPlaybook, RecoverySupervisor,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Alert manager with every channel the configuration enables
pub fn build_alert_manager(config: &AppConfig) -> Result<AlertManager> {
    let mut manager = AlertManager::new();

    if let Some((token, chat_id)) = config.notify.telegram() {
        let telegram = TelegramNotifier::new(token, chat_id, config.notify.timeout())?;
        manager = manager.with_channel(Arc::new(telegram));
    }

    if let Some(url) = config.notify.webhook() {
        let feishu = FeishuNotifier::new(url, config.notify.timeout())?;
        manager = manager.with_channel(Arc::new(feishu));
    }

    if !manager.is_enabled() {
        info!("No notification channel configured, alerts are logged only");
    }
    Ok(manager)
}

pub fn build_supervisor(config: &AppConfig, state_file: Option<PathBuf>) -> Result<RecoverySupervisor> {
    let gateway = &config.gateway;
    let http = GatewayClient::from_config(gateway)?;
    let checks = Arc::new(LocalGateway::new(gateway.clone(), http.clone()));

    let store = StateStore::new(state_file.unwrap_or_else(|| config.state_file.clone()));
    let playbook = RecoveryPlaybook::new(gateway.endpoint(), gateway.process_name.clone());
    let notifier = Arc::new(build_alert_manager(config)?);

    let mut supervisor = RecoverySupervisor::new(checks, store, playbook, notifier);

    match (http, gateway.base_url.as_deref()) {
        (Some(client), Some(base)) => {
            let login_url = url::Url::parse(base)?.join(&config.login.login_path)?;
            let browser = Arc::new(WebDriverBrowser::new(
                &config.login.webdriver_url,
                login_url.as_str(),
                config.login.element_timeout(),
                config.login.step_timeout(),
            ));
            let budget = LoginBudget {
                poll_interval: config.login.poll_interval(),
                max_polls: config.login.max_polls,
                step_timeout: config.login.step_timeout(),
            };
            let driver = Arc::new(BrowserLoginDriver::new(browser, Arc::new(client), budget));

            let credentials = config.credentials();
            if credentials.is_none() {
                warn!("Gateway credentials not configured, automated re-login will fail");
            }
            supervisor = supervisor.with_login(driver, credentials);
        }
        _ => info!("Gateway HTTP API not configured, running socket-only checks"),
    }

    Ok(supervisor)
}
