use thiserror::Error;

/// Main error type for the gateway keepalive supervisor
#[derive(Error, Debug)]
pub enum KeepaliveError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Health check errors
    #[error("Probe unavailable: {0}")]
    ProbeUnavailable(String),

    // Recovery errors
    #[error("Auth recovery failed: {0}")]
    AuthRecoveryFailed(String),

    #[error("Browser automation unavailable: {0}")]
    AutomationUnavailable(String),

    #[error("WebDriver command failed: {0}")]
    WebDriver(String),

    // Notification errors (never fatal)
    #[error("Notification delivery failed: {channel} - {reason}")]
    NotificationDeliveryFailed { channel: String, reason: String },

    // Persisted state errors
    #[error("State store error: {0}")]
    StateStore(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for KeepaliveError
pub type Result<T> = std::result::Result<T, KeepaliveError>;

impl From<fantoccini::error::NewSessionError> for KeepaliveError {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        KeepaliveError::AutomationUnavailable(err.to_string())
    }
}

impl From<fantoccini::error::CmdError> for KeepaliveError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        KeepaliveError::WebDriver(err.to_string())
    }
}
