use config::{Config, ConfigError, Environment, File, Map};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::Credentials;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Single-slot marker holding the last classification
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host of the gateway API socket
    pub host: String,
    /// API socket port (live=4001, paper=4002)
    pub port: u16,
    /// Substring matched against running process names / command lines
    pub process_name: String,
    /// Base URL of the gateway HTTP API (e.g. "https://localhost:5000").
    /// Without it the gateway is treated as socket-only: no auth check,
    /// no tickle, no automated login.
    #[serde(default)]
    pub base_url: Option<String>,
    pub auth_status_path: String,
    pub tickle_path: String,
    /// The gateway serves a self-signed certificate on localhost
    pub accept_invalid_certs: bool,
    pub port_timeout_secs: u64,
    pub http_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn port_timeout(&self) -> Duration {
        Duration::from_secs(self.port_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginConfig {
    /// Path of the login page relative to the gateway base URL
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// WebDriver endpoint (chromedriver / geckodriver)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    /// How long to wait for the login form to render
    #[serde(default = "default_element_timeout")]
    pub element_timeout_secs: u64,
    /// Deadline for each browser step: session setup, page load, submit, close
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_login_path() -> String {
    "/".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_max_polls() -> u32 {
    30
}

fn default_element_timeout() -> u64 {
    15
}

fn default_step_timeout() -> u64 {
    30
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            webdriver_url: default_webdriver_url(),
            poll_interval_secs: default_poll_interval(),
            max_polls: default_max_polls(),
            element_timeout_secs: default_element_timeout(),
            step_timeout_secs: default_step_timeout(),
            username: None,
            password: None,
        }
    }
}

impl LoginConfig {
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.username.as_deref(), self.password.as_deref())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("login_path", &self.login_path)
            .field("webdriver_url", &self.webdriver_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_polls", &self.max_polls)
            .field("element_timeout_secs", &self.element_timeout_secs)
            .field("step_timeout_secs", &self.step_timeout_secs)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    /// Feishu / Lark compatible incoming webhook
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_chat_id: None,
            webhook_url: None,
            timeout_secs: default_notify_timeout(),
        }
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Telegram target, only when both token and chat id are non-empty
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (
            non_empty(self.telegram_bot_token.as_deref()),
            non_empty(self.telegram_chat_id.as_deref()),
        ) {
            (Some(token), Some(chat)) => Some((token, chat)),
            _ => None,
        }
    }

    pub fn webhook(&self) -> Option<&str> {
        non_empty(self.webhook_url.as_deref())
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "<redacted>"),
            )
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".gw_state")
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rolling log files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

/// Flat variables understood for compatibility with existing cron setups
const LEGACY_ENV: &[(&str, &str)] = &[
    ("IB_HOST", "gateway.host"),
    ("IB_BASE_URL", "gateway.base_url"),
    ("IB_USERNAME", "login.username"),
    ("IB_PASSWORD", "login.password"),
    ("TG_BOT_TOKEN", "notify.telegram_bot_token"),
    ("TG_CHAT_ID", "notify.telegram_chat_id"),
    ("FEISHU_WEBHOOK_URL", "notify.webhook_url"),
];

impl AppConfig {
    /// Load configuration from a directory and the process environment
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        // non-UTF-8 variables can't name any of our keys
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::load_with(config_dir, env)
    }

    /// Load configuration against an explicit set of environment variables
    pub fn load_with<P: AsRef<Path>>(
        config_dir: P,
        env: Map<String, String>,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with default values
            .set_default("gateway.host", "127.0.0.1")?
            .set_default("gateway.port", 4001)?
            .set_default("gateway.process_name", "ibgateway")?
            .set_default("gateway.auth_status_path", "/v1/api/iserver/auth/status")?
            .set_default("gateway.tickle_path", "/v1/api/tickle")?
            .set_default("gateway.accept_invalid_certs", true)?
            .set_default("gateway.port_timeout_secs", 5)?
            .set_default("gateway.http_timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (KEEPALIVE_GATEWAY__PORT, etc.).
            // Values stay strings so secrets like "007" survive; numeric
            // fields are converted on deserialize.
            .add_source(
                Environment::with_prefix("KEEPALIVE")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env.clone())),
            );

        for (var, key) in LEGACY_ENV {
            let value = env.get(*var).filter(|v| !v.is_empty()).cloned();
            builder = builder.set_override_option(*key, value)?;
        }
        let legacy_port = env.get("IB_PORT").and_then(|v| v.trim().parse::<i64>().ok());
        builder = builder.set_override_option("gateway.port", legacy_port)?;

        builder.build()?.try_deserialize()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.login.credentials()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.gateway.host.trim().is_empty() {
            errors.push("gateway.host must not be empty".to_string());
        }

        if self.gateway.port == 0 {
            errors.push("gateway.port must be non-zero".to_string());
        }

        if self.gateway.process_name.trim().is_empty() {
            errors.push("gateway.process_name must not be empty".to_string());
        }

        if self.gateway.port_timeout_secs == 0 || self.gateway.http_timeout_secs == 0 {
            errors.push("gateway timeouts must be positive".to_string());
        }

        if let Some(base) = &self.gateway.base_url {
            if let Err(e) = url::Url::parse(base) {
                errors.push(format!("gateway.base_url is not a valid URL: {e}"));
            }
        }

        if self.login.poll_interval_secs == 0 {
            errors.push("login.poll_interval_secs must be positive".to_string());
        }

        if self.login.max_polls == 0 {
            errors.push("login.max_polls must be positive".to_string());
        }

        if self.login.element_timeout_secs == 0 {
            errors.push("login.element_timeout_secs must be positive".to_string());
        }

        if self.login.step_timeout_secs == 0 {
            errors.push("login.step_timeout_secs must be positive".to_string());
        }

        if self.notify.timeout_secs == 0 {
            errors.push("notify.timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_dir() -> PathBuf {
        std::env::temp_dir().join("gateway_keepalive_no_config_here")
    }

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let env: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::load_with(empty_dir(), env).unwrap()
    }

    #[test]
    fn test_defaults_load_without_files() {
        let config = load(&[]);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.gateway.port, 4001);
        assert_eq!(config.gateway.process_name, "ibgateway");
        assert!(config.gateway.base_url.is_none());
        assert_eq!(config.login.poll_interval_secs, 2);
        assert_eq!(config.login.max_polls, 30);
        assert_eq!(config.state_file, PathBuf::from(".gw_state"));
        assert!(config.credentials().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_overrides() {
        let config = load(&[
            ("IB_HOST", "10.0.0.5"),
            ("IB_PORT", "4002"),
            ("TG_BOT_TOKEN", "123:abc"),
            ("TG_CHAT_ID", "42"),
            ("IB_USERNAME", "trader"),
            ("IB_PASSWORD", "pw"),
        ]);
        assert_eq!(config.gateway.host, "10.0.0.5");
        assert_eq!(config.gateway.port, 4002);
        assert_eq!(config.notify.telegram(), Some(("123:abc", "42")));
        assert_eq!(config.credentials().unwrap().username(), "trader");
    }

    #[test]
    fn test_prefixed_env_overrides() {
        let config = load(&[
            ("KEEPALIVE_GATEWAY__PORT", "4555"),
            ("KEEPALIVE_GATEWAY__ACCEPT_INVALID_CERTS", "false"),
            ("KEEPALIVE_LOGIN__USERNAME", "trader"),
            ("KEEPALIVE_LOGIN__PASSWORD", "007"),
            ("KEEPALIVE_LOGIN__STEP_TIMEOUT_SECS", "20"),
            ("KEEPALIVE_STATE_FILE", "/var/lib/keepalive/state"),
        ]);
        assert_eq!(config.gateway.port, 4555);
        assert!(!config.gateway.accept_invalid_certs);
        assert_eq!(config.login.step_timeout(), Duration::from_secs(20));
        assert_eq!(config.state_file, PathBuf::from("/var/lib/keepalive/state"));

        // numeric-looking secrets keep their exact text
        let creds = config.credentials().unwrap();
        assert_eq!(creds.username(), "trader");
        assert_eq!(creds.password(), "007");
    }

    #[test]
    fn test_legacy_env_wins_over_prefixed() {
        let config = load(&[("KEEPALIVE_GATEWAY__PORT", "4555"), ("IB_PORT", "4002")]);
        assert_eq!(config.gateway.port, 4002);
    }

    #[test]
    fn test_unrelated_env_is_ignored() {
        let config = load(&[("KEEPALIVEX_GATEWAY__PORT", "1"), ("PORT", "2")]);
        assert_eq!(config.gateway.port, 4001);
    }

    #[test]
    fn test_empty_legacy_values_are_ignored() {
        let config = load(&[("TG_BOT_TOKEN", ""), ("IB_PORT", "not-a-port")]);
        assert!(config.notify.telegram().is_none());
        assert_eq!(config.gateway.port, 4001);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = load(&[]);
        config.gateway.port = 0;
        config.login.max_polls = 0;
        config.gateway.base_url = Some("not a url".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[("IB_PASSWORD", "s3cret"), ("TG_BOT_TOKEN", "bot-token")]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("bot-token"));
    }
}
