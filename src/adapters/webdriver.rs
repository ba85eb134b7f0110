//! Headless browser session over WebDriver
//!
//! Needs a running chromedriver (or any W3C WebDriver endpoint). Each login
//! attempt gets a brand new session, and with it a fresh browser profile.
//! Session setup, page load and teardown each run under `command_timeout`.

use crate::domain::Credentials;
use crate::error::{KeepaliveError, Result};
use crate::supervisor::{Browser, LoginForm, SubmitMethod};
use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Inputs are located by name attribute; layouts differ between page variants
const USERNAME_SELECTOR: &str = "input[name='username'], input[name='user_name']";
const PASSWORD_SELECTOR: &str = "input[name='password']";
const SUBMIT_SELECTOR: &str = "button[type='submit'], input[type='submit']";

/// WebDriver code point for the Enter key
const ENTER_KEY: &str = "\u{E007}";

#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    webdriver_url: String,
    login_url: String,
    element_timeout: Duration,
    command_timeout: Duration,
}

impl WebDriverBrowser {
    pub fn new(
        webdriver_url: &str,
        login_url: &str,
        element_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            login_url: login_url.to_string(),
            element_timeout,
            command_timeout,
        }
    }

    fn capabilities() -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();
        // the gateway serves a self-signed certificate on localhost
        caps.insert("acceptInsecureCerts".to_string(), json!(true));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--incognito",
                    "--disable-gpu",
                    "--disable-extensions",
                    "--no-first-run",
                    "--window-size=1280,900"
                ]
            }),
        );
        caps
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open_login_page(&self) -> Result<Box<dyn LoginForm>> {
        let connect = async {
            let mut builder = ClientBuilder::native();
            builder.capabilities(Self::capabilities());
            builder.connect(&self.webdriver_url).await
        };
        let client = match timeout(self.command_timeout, connect).await {
            Ok(client) => client?,
            Err(_) => {
                return Err(KeepaliveError::AutomationUnavailable(format!(
                    "no session from WebDriver at {} within {:?}",
                    self.webdriver_url, self.command_timeout
                )))
            }
        };
        debug!("WebDriver session opened at {}", self.webdriver_url);

        let load = async {
            client
                .update_timeouts(TimeoutConfiguration::new(
                    None,
                    Some(self.command_timeout),
                    None,
                ))
                .await?;
            client.goto(&self.login_url).await
        };
        let loaded = timeout(self.command_timeout, load).await;
        match loaded {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                close_within(client, self.command_timeout).await;
                return Err(e.into());
            }
            Err(_) => {
                close_within(client, self.command_timeout).await;
                return Err(KeepaliveError::WebDriver(format!(
                    "login page did not load within {:?}",
                    self.command_timeout
                )));
            }
        }
        info!("Login page loaded: {}", self.login_url);

        Ok(Box::new(WebDriverSession {
            client,
            element_timeout: self.element_timeout,
            command_timeout: self.command_timeout,
        }))
    }
}

/// Best-effort teardown on a failed setup
async fn close_within(client: Client, limit: Duration) {
    match timeout(limit, client.close()).await {
        Ok(Ok(())) => debug!("WebDriver session closed"),
        Ok(Err(e)) => debug!("Closing WebDriver session failed: {}", e),
        Err(_) => warn!("WebDriver session did not close within {:?}", limit),
    }
}

struct WebDriverSession {
    client: Client,
    element_timeout: Duration,
    command_timeout: Duration,
}

#[async_trait]
impl LoginForm for WebDriverSession {
    async fn submit(&mut self, credentials: &Credentials) -> Result<SubmitMethod> {
        let username = self
            .client
            .wait()
            .at_most(self.element_timeout)
            .for_element(Locator::Css(USERNAME_SELECTOR))
            .await
            .map_err(|e| KeepaliveError::WebDriver(format!("username field not found: {}", e)))?;
        username.clear().await?;
        username
            .send_keys(credentials.username())
            .await
            .map_err(|_| KeepaliveError::WebDriver("could not type username".to_string()))?;

        let password = self
            .client
            .find(Locator::Css(PASSWORD_SELECTOR))
            .await
            .map_err(|e| KeepaliveError::WebDriver(format!("password field not found: {}", e)))?;
        password.clear().await?;
        password
            .send_keys(credentials.password())
            .await
            .map_err(|_| KeepaliveError::WebDriver("could not type password".to_string()))?;

        match self.client.find(Locator::Css(SUBMIT_SELECTOR)).await {
            Ok(button) => {
                button.click().await?;
                Ok(SubmitMethod::SubmitControl)
            }
            Err(_) => {
                debug!("No submit control on page, pressing Enter in password field");
                password.send_keys(ENTER_KEY).await?;
                Ok(SubmitMethod::EnterKey)
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        match timeout(self.command_timeout, self.client.close()).await {
            Ok(closed) => closed?,
            Err(_) => {
                return Err(KeepaliveError::WebDriver(format!(
                    "session did not close within {:?}",
                    self.command_timeout
                )))
            }
        }
        debug!("WebDriver session closed");
        Ok(())
    }
}
