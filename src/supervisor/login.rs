//! Automated Login Driver
//!
//! Replays the gateway's web login when the session has expired but the
//! process and port are fine. Success is decided by the gateway's own auth
//! status after submission, never by what the page shows.

use super::probe::AuthStatusSource;
use crate::domain::{Credentials, RecoveryAttempt};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How the login form was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMethod {
    SubmitControl,
    /// No submit control on the page; Enter pressed in the password field
    EnterKey,
}

/// A loaded login page inside a browser session
#[async_trait]
pub trait LoginForm: Send {
    async fn submit(&mut self, credentials: &Credentials) -> Result<SubmitMethod>;

    /// Tear the browser session down
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Launches isolated browser sessions on the login entry point
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open_login_page(&self) -> Result<Box<dyn LoginForm>>;
}

/// Re-authentication capability used by the supervisor
#[async_trait]
pub trait LoginDriver: Send + Sync {
    async fn attempt_login(&self, credentials: &Credentials) -> RecoveryAttempt;
}

/// Time limits of one login attempt
#[derive(Debug, Clone, Copy)]
pub struct LoginBudget {
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Deadline for each browser step (open, submit, close)
    pub step_timeout: Duration,
}

impl Default for LoginBudget {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
            step_timeout: Duration::from_secs(30),
        }
    }
}

impl LoginBudget {
    pub fn total(&self) -> Duration {
        self.poll_interval * self.max_polls
    }
}

/// Poll until the session reports authenticated or the budget runs out.
///
/// Returns whether authentication was observed and the polls used.
pub async fn poll_until_authenticated(
    source: &dyn AuthStatusSource,
    budget: &LoginBudget,
) -> (bool, u32) {
    for poll in 1..=budget.max_polls {
        tokio::time::sleep(budget.poll_interval).await;
        match source.auth_status().await {
            Ok(status) if status.authenticated => return (true, poll),
            Ok(status) => debug!("Poll {}/{}: {}", poll, budget.max_polls, status.detail()),
            Err(e) => debug!("Poll {}/{}: auth status unavailable: {}", poll, budget.max_polls, e),
        }
    }
    (false, budget.max_polls)
}

pub struct BrowserLoginDriver {
    browser: Arc<dyn Browser>,
    auth: Arc<dyn AuthStatusSource>,
    budget: LoginBudget,
}

impl BrowserLoginDriver {
    pub fn new(
        browser: Arc<dyn Browser>,
        auth: Arc<dyn AuthStatusSource>,
        budget: LoginBudget,
    ) -> Self {
        Self {
            browser,
            auth,
            budget,
        }
    }
}

#[async_trait]
impl LoginDriver for BrowserLoginDriver {
    async fn attempt_login(&self, credentials: &Credentials) -> RecoveryAttempt {
        let started = Instant::now();
        let step = self.budget.step_timeout;

        let mut form = match timeout(step, self.browser.open_login_page()).await {
            Ok(Ok(form)) => form,
            Ok(Err(e)) => {
                warn!("Could not start browser session: {}", e);
                return RecoveryAttempt::error(e.to_string(), 0, started.elapsed());
            }
            Err(_) => {
                warn!("Browser did not load the login page within {:?}", step);
                return RecoveryAttempt::error(
                    format!("opening login page timed out after {:?}", step),
                    0,
                    started.elapsed(),
                );
            }
        };

        // keep the session open while polling; closed below on every path
        let attempt = match timeout(step, form.submit(credentials)).await {
            Ok(Ok(method)) => {
                info!(
                    "Login form submitted ({:?}), waiting up to {}s for authentication",
                    method,
                    self.budget.total().as_secs()
                );
                match poll_until_authenticated(self.auth.as_ref(), &self.budget).await {
                    (true, polls) => RecoveryAttempt::success(polls, started.elapsed()),
                    (false, polls) => RecoveryAttempt::timeout(polls, started.elapsed()),
                }
            }
            Ok(Err(e)) => {
                warn!("Login form submission failed: {}", e);
                RecoveryAttempt::error(e.to_string(), 0, started.elapsed())
            }
            Err(_) => {
                warn!("Login form submission stalled for {:?}", step);
                RecoveryAttempt::error(
                    format!("submitting login form timed out after {:?}", step),
                    0,
                    started.elapsed(),
                )
            }
        };

        match timeout(step, form.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to close browser session: {}", e),
            Err(_) => warn!("Browser session did not close within {:?}", step),
        }

        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthStatus, RecoveryOutcome};
    use crate::error::KeepaliveError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Reports authenticated from the `authenticated_at`-th call on
    struct ScriptedAuth {
        calls: AtomicU32,
        authenticated_at: Option<u32>,
    }

    #[async_trait]
    impl AuthStatusSource for ScriptedAuth {
        async fn auth_status(&self) -> Result<AuthStatus> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AuthStatus {
                authenticated: self.authenticated_at.map_or(false, |n| call >= n),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct BrowserLog {
        opened: u32,
        closed: u32,
        submitted_user: Option<String>,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Fault {
        None,
        FailOpen,
        FailSubmit,
        HangOpen,
        HangSubmit,
    }

    const HANG: Duration = Duration::from_secs(3600);

    struct FakeBrowser {
        log: Arc<Mutex<BrowserLog>>,
        fault: Fault,
    }

    struct FakeForm {
        log: Arc<Mutex<BrowserLog>>,
        fault: Fault,
    }

    #[async_trait]
    impl Browser for FakeBrowser {
        async fn open_login_page(&self) -> Result<Box<dyn LoginForm>> {
            match self.fault {
                Fault::FailOpen => {
                    return Err(KeepaliveError::AutomationUnavailable(
                        "webdriver not running".to_string(),
                    ))
                }
                Fault::HangOpen => tokio::time::sleep(HANG).await,
                _ => {}
            }
            self.log.lock().unwrap().opened += 1;
            Ok(Box::new(FakeForm {
                log: self.log.clone(),
                fault: self.fault,
            }))
        }
    }

    #[async_trait]
    impl LoginForm for FakeForm {
        async fn submit(&mut self, credentials: &Credentials) -> Result<SubmitMethod> {
            match self.fault {
                Fault::FailSubmit => {
                    return Err(KeepaliveError::WebDriver(
                        "username field not found".to_string(),
                    ))
                }
                Fault::HangSubmit => tokio::time::sleep(HANG).await,
                _ => {}
            }
            self.log.lock().unwrap().submitted_user = Some(credentials.username().to_string());
            Ok(SubmitMethod::EnterKey)
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.log.lock().unwrap().closed += 1;
            Ok(())
        }
    }

    fn budget() -> LoginBudget {
        LoginBudget {
            poll_interval: Duration::from_millis(5),
            max_polls: 4,
            step_timeout: Duration::from_millis(100),
        }
    }

    fn driver(
        fault: Fault,
        authenticated_at: Option<u32>,
    ) -> (BrowserLoginDriver, Arc<Mutex<BrowserLog>>, Arc<ScriptedAuth>) {
        let log = Arc::new(Mutex::new(BrowserLog::default()));
        let auth = Arc::new(ScriptedAuth {
            calls: AtomicU32::new(0),
            authenticated_at,
        });
        let browser = Arc::new(FakeBrowser {
            log: log.clone(),
            fault,
        });
        (
            BrowserLoginDriver::new(browser, auth.clone(), budget()),
            log,
            auth,
        )
    }

    fn creds() -> Credentials {
        Credentials::new("trader", "pw")
    }

    #[tokio::test]
    async fn test_success_stops_at_first_authenticated_poll() {
        let (driver, log, auth) = driver(Fault::None, Some(2));
        let attempt = driver.attempt_login(&creds()).await;

        assert_eq!(attempt.outcome, RecoveryOutcome::Success);
        assert_eq!(attempt.polls, 2);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
        let log = log.lock().unwrap();
        assert_eq!(log.submitted_user.as_deref(), Some("trader"));
        assert_eq!((log.opened, log.closed), (1, 1));
    }

    #[tokio::test]
    async fn test_timeout_exhausts_budget_and_closes() {
        let (driver, log, auth) = driver(Fault::None, None);
        let attempt = driver.attempt_login(&creds()).await;

        assert_eq!(attempt.outcome, RecoveryOutcome::Timeout);
        assert_eq!(attempt.polls, 4);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 4);
        assert_eq!(log.lock().unwrap().closed, 1);
    }

    #[tokio::test]
    async fn test_submit_error_closes_and_skips_polling() {
        let (driver, log, auth) = driver(Fault::FailSubmit, Some(1));
        let attempt = driver.attempt_login(&creds()).await;

        assert_eq!(attempt.outcome, RecoveryOutcome::Error);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
        assert_eq!(log.lock().unwrap().closed, 1);
        assert!(attempt.reason().contains("username field not found"));
    }

    #[tokio::test]
    async fn test_unavailable_browser_is_error() {
        let (driver, log, _) = driver(Fault::FailOpen, Some(1));
        let attempt = driver.attempt_login(&creds()).await;

        assert_eq!(attempt.outcome, RecoveryOutcome::Error);
        assert!(attempt.reason().contains("webdriver not running"));
        assert_eq!(log.lock().unwrap().opened, 0);
    }

    #[tokio::test]
    async fn test_hung_login_page_gives_up_after_step_timeout() {
        let (driver, log, auth) = driver(Fault::HangOpen, Some(1));
        let started = Instant::now();
        let attempt = driver.attempt_login(&creds()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(attempt.outcome, RecoveryOutcome::Error);
        assert!(attempt.reason().contains("opening login page timed out"));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
        assert_eq!(log.lock().unwrap().opened, 0);
    }

    #[tokio::test]
    async fn test_hung_submit_still_closes_session() {
        let (driver, log, auth) = driver(Fault::HangSubmit, Some(1));
        let started = Instant::now();
        let attempt = driver.attempt_login(&creds()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(attempt.outcome, RecoveryOutcome::Error);
        assert!(attempt.reason().contains("submitting login form timed out"));
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
        let log = log.lock().unwrap();
        assert_eq!((log.opened, log.closed), (1, 1));
    }

    #[test]
    fn test_default_budget_is_sixty_seconds() {
        assert_eq!(LoginBudget::default().total(), Duration::from_secs(60));
    }
}
