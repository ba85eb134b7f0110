mod main_runtime;

use anyhow::Context;
use clap::Parser;
use gateway_keepalive::bootstrap::build_supervisor;
use gateway_keepalive::cli::{self, Cli, Commands};
use gateway_keepalive::config::AppConfig;
use gateway_keepalive::error::KeepaliveError;
use gateway_keepalive::persistence::StateStore;
use main_runtime::{init_logging, init_logging_simple};
use tracing::{error, info};

/// Exit status reflects misconfiguration only, never gateway health
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Existing environment variables win over .env entries
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match AppConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging_simple();
            error!("Failed to load configuration: {}", e);
            return Err(e).context("loading configuration");
        }
    };
    if let Err(errors) = config.validate() {
        init_logging_simple();
        for e in &errors {
            error!("Invalid configuration: {}", e);
        }
        return Err(KeepaliveError::InvalidConfig(errors.join("; ")).into());
    }
    init_logging(&config.logging);

    match cli.command() {
        Commands::Check => {
            let supervisor = build_supervisor(&config, cli.state_file.clone())?;
            let report = supervisor
                .run_cycle()
                .await
                .context("health check cycle failed")?;
            info!("Cycle complete: {}", cli::summarize_cycle(&report));
        }
        Commands::Status => {
            let supervisor = build_supervisor(&config, cli.state_file.clone())?;
            let (previous, report) = supervisor.status().await?;
            cli::print_status(previous, &report);
        }
        Commands::Reset => {
            let path = cli
                .state_file
                .clone()
                .unwrap_or_else(|| config.state_file.clone());
            let store = StateStore::new(&path);
            if store.reset().await? {
                println!("State marker {} removed", path.display());
            } else {
                println!("No state marker at {}", path.display());
            }
        }
    }

    Ok(())
}
