pub mod adapters;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod supervisor;

pub use config::AppConfig;
pub use domain::{
    Credentials, HealthClassification, ProbeReport, ProcessStatus, RecoveryAttempt,
    RecoveryOutcome, StateToken,
};
pub use error::{KeepaliveError, Result};
pub use persistence::StateStore;
pub use supervisor::{
    Alert, AlertLevel, AlertManager, CycleReport, GatewayChecks, LoginDriver, Notifier,
    RecoveryAction, RecoveryPlaybook, RecoverySupervisor,
};
