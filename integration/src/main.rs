//! Runs a proxy upgrade scenario against a live node. Assumes the contracts
//! are already deployed.

use chain::AlloyBackend;
use clap::Parser;
use cli::Cli;
use config::OrchestratorConfig;
use eyre::Result;
use orchestrator::UpgradeOrchestrator;
use proxy_scripts::constants::{DEFAULT_LOG_FILTER, LOG_FILTER_ENV_VAR};
use scenarios::ScenarioParams;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod chain;
mod cli;
mod config;
mod constants;
mod errors;
#[cfg(test)]
mod mock;
mod orchestrator;
mod scenarios;
mod steps;
mod system;

#[tokio::main]
async fn main() -> Result<()> {
    // Load settings from a `.env` file, if present, before parsing arguments
    dotenvy::dotenv().ok();

    let Cli { scenario, config, params } = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = OrchestratorConfig::from_args(config)?;
    debug!(?config, "resolved configuration");

    let backend = AlloyBackend::connect(&config).await?;
    let steps = scenario.steps(&ScenarioParams::from(params));
    info!("running {scenario:?} ({} steps)", steps.len());

    let report = UpgradeOrchestrator::new(&backend, config.contracts, config.recipient)
        .run(&steps)
        .await?;

    for record in &report.records {
        info!(step = record.index, "{}: {}", record.label, record.outcome);
    }
    info!("{}", report.summary());

    Ok(())
}
