//! HTTP client for the gateway's local API
//!
//! Covers the two calls the supervisor needs: auth status and tickle.

use crate::config::GatewayConfig;
use crate::domain::AuthStatus;
use crate::error::{KeepaliveError, Result};
use crate::supervisor::AuthStatusSource;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    auth_status_url: Url,
    tickle_url: Url,
}

impl GatewayClient {
    pub fn new(base_url: &str, config: &GatewayConfig) -> Result<Self> {
        let base = Url::parse(base_url)?;
        let client = Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(config.http_timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            auth_status_url: base.join(&config.auth_status_path)?,
            tickle_url: base.join(&config.tickle_path)?,
        })
    }

    /// Build a client when the gateway exposes an HTTP API
    pub fn from_config(config: &GatewayConfig) -> Result<Option<Self>> {
        config
            .base_url
            .as_deref()
            .map(|base| Self::new(base, config))
            .transpose()
    }

    /// Query the application-level auth status.
    ///
    /// A refused connection means nothing is listening, which is a probe
    /// failure and not an expired session. A 401 is the gateway saying the
    /// brokerage session is gone.
    pub async fn auth_status(&self) -> Result<AuthStatus> {
        let resp = self
            .client
            .get(self.auth_status_url.clone())
            .send()
            .await
            .map_err(|e| describe_transport_error(&self.auth_status_url, e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(AuthStatus {
                authenticated: false,
                message: "HTTP 401".to_string(),
                ..Default::default()
            });
        }
        if !status.is_success() {
            return Err(KeepaliveError::ProbeUnavailable(format!(
                "auth status returned HTTP {}",
                status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| describe_transport_error(&self.auth_status_url, e))?;
        let parsed: AuthStatus = serde_json::from_str(&body).map_err(|e| {
            KeepaliveError::ProbeUnavailable(format!("malformed auth status body: {}", e))
        })?;

        debug!("Auth status: {}", parsed.detail());
        Ok(parsed)
    }

    /// Keepalive call that extends the session without re-authenticating
    pub async fn tickle(&self) -> Result<()> {
        let resp = self
            .client
            .post(self.tickle_url.clone())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| describe_transport_error(&self.tickle_url, e))?;

        if resp.status().is_success() {
            debug!("Tickle accepted");
            Ok(())
        } else {
            Err(KeepaliveError::ProbeUnavailable(format!(
                "tickle returned HTTP {}",
                resp.status()
            )))
        }
    }
}

#[async_trait]
impl AuthStatusSource for GatewayClient {
    async fn auth_status(&self) -> Result<AuthStatus> {
        GatewayClient::auth_status(self).await
    }
}

fn describe_transport_error(url: &Url, e: reqwest::Error) -> KeepaliveError {
    let reason = if e.is_connect() {
        "connection refused"
    } else if e.is_timeout() {
        "timed out"
    } else if e.is_decode() {
        "malformed response"
    } else {
        return KeepaliveError::Http(e);
    };
    KeepaliveError::ProbeUnavailable(format!("{} ({})", reason, url))
}
