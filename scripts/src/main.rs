use clap::Parser;
use proxy_scripts::{
    cli::Cli,
    constants::{DEFAULT_LOG_FILTER, LOG_FILTER_ENV_VAR},
    errors::ScriptError,
    utils::setup_client,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    // Load settings from a `.env` file, if present, before parsing arguments
    dotenvy::dotenv().ok();

    let Cli {
        priv_key,
        rpc_url,
        deployments_path,
        command,
    } = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).pretty().init();

    let client = setup_client(&priv_key, &rpc_url).await?;

    command.run(client, &deployments_path).await
}
