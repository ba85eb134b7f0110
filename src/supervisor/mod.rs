//! Supervisor Layer for Gateway Monitoring and Recovery
//!
//! - Health probe: process, port and auth checks in priority order
//! - Playbook: transition to action mapping
//! - Recovery supervisor: the edge-triggered cycle
//! - Login driver: automated re-authentication
//! - Alert manager: best-effort operator notifications

pub mod alert_manager;
pub mod login;
pub mod playbook;
pub mod probe;
pub mod recovery;

pub use alert_manager::{Alert, AlertLevel, AlertManager, NotificationChannel, Notifier};
pub use login::{
    poll_until_authenticated, Browser, BrowserLoginDriver, LoginBudget, LoginDriver, LoginForm,
    SubmitMethod,
};
pub use playbook::{CyclePlan, RecoveryAction, RecoveryPlaybook};
pub use probe::{AuthStatusSource, GatewayChecks, HealthProbe};
pub use recovery::{CycleReport, RecoverySupervisor};
