use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{AuthCheck, ProbeReport, StateToken};
use crate::supervisor::CycleReport;

#[derive(Parser, Debug)]
#[command(name = "gateway-keepalive")]
#[command(version)]
#[command(about = "Broker gateway health check with edge-triggered alerts and automated re-login", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml
    #[arg(short, long, default_value = "config", env = "KEEPALIVE_CONFIG_DIR")]
    pub config: PathBuf,

    /// Override the state marker location
    #[arg(long, env = "KEEPALIVE_STATE_FILE")]
    pub state_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run one health check cycle (default)
    Check,
    /// Probe the gateway and print the result, without alerts or state changes
    Status,
    /// Delete the state marker so the next transition is notified again
    Reset,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Check)
    }
}

/// Print the probe result for `status`
pub fn print_status(previous: StateToken, report: &ProbeReport) {
    let marker = if report.classification.is_healthy() {
        "\x1b[32m✓\x1b[0m"
    } else {
        "\x1b[31m✗\x1b[0m"
    };
    println!("{} gateway: {}", marker, report.classification);
    println!("  last recorded: {}", previous);
    println!("  process:       {}", report.process);
    println!(
        "  port:          {}",
        match report.port_reachable {
            Some(true) => "open",
            Some(false) => "closed",
            None => "not checked",
        }
    );
    let auth = match &report.auth {
        AuthCheck::Skipped => "not checked".to_string(),
        AuthCheck::NotConfigured => "no HTTP API configured".to_string(),
        AuthCheck::Reported(status) => status.detail(),
        AuthCheck::Failed { reason } => format!("failed: {}", reason),
    };
    println!("  auth:          {}", auth);
}

/// One-line summary of a finished cycle
pub fn summarize_cycle(report: &CycleReport) -> String {
    let mut summary = format!(
        "{} -> {} (persisted {}, {} notification(s))",
        report.previous,
        report.observed(),
        report.persisted,
        report.notifications
    );
    if let Some(ok) = report.tickled {
        summary.push_str(if ok { ", tickle ok" } else { ", tickle failed" });
    }
    if let Some(attempt) = &report.relogin {
        summary.push_str(&format!(", relogin {}", attempt.outcome));
    }
    summary
}
