//! Definitions of CLI arguments and commands for the proxy management scripts

use std::path::{Path, PathBuf};

use alloy::providers::DynProvider;
use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy, status, transfer_admin, upgrade},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_PATH, DEFAULT_DEVNET_PKEY,
        DEFAULT_INITIAL_SUPPLY, DEFAULT_RPC_URL, DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_SYMBOL,
    },
    errors::ScriptError,
    types::ImplementationVersion,
};

/// Deploy and manage an upgradeable token behind a transparent proxy
#[derive(Parser)]
pub struct Cli {
    /// Private key of the account sending transactions
    #[arg(short, long, env = "PRIVATE_KEY", default_value = DEFAULT_DEVNET_PKEY, hide_default_value = true)]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Path to the file in which deployed addresses are recorded
    #[arg(short, long, env = "DEPLOYMENTS_PATH", default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the proxy admin, both implementations and the proxy
    Deploy(DeployArgs),
    /// Point the proxy at a new implementation
    Upgrade(UpgradeArgs),
    /// Hand the proxy admin over to a new owner
    TransferAdmin(TransferAdminArgs),
    /// Print the admin, implementation and owners of a proxy
    Status(StatusArgs),
}

impl Command {
    /// Run the command with the given client
    pub async fn run(
        self,
        client: DynProvider,
        deployments_path: &Path,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, client, deployments_path).await,
            Command::Upgrade(args) => upgrade(args, client, deployments_path).await,
            Command::TransferAdmin(args) => transfer_admin(args, client, deployments_path).await,
            Command::Status(args) => status(args, client, deployments_path).await,
        }
    }
}

/// Deploy the upgradeable token.
///
/// Concretely, this deploys a `ProxyAdmin`, `ImplementationV1`, and a
/// `TransparentUpgradeableProxy` administered by the `ProxyAdmin` and
/// delegating to `ImplementationV1`, initializes the token through the proxy,
/// and finally deploys `ImplementationV2` as the upgrade target.
///
/// Calls made directly to the proxy are forwarded to the implementation contract.
/// Upgrade calls can only be made to the proxy through the `ProxyAdmin`.
#[derive(Args)]
pub struct DeployArgs {
    /// Directory containing the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// The token name passed to `initialize`
    #[arg(long, default_value = DEFAULT_TOKEN_NAME)]
    pub name: String,

    /// The token symbol passed to `initialize`
    #[arg(long, default_value = DEFAULT_TOKEN_SYMBOL)]
    pub symbol: String,

    /// The supply minted to the deployer on initialization
    #[arg(long, default_value_t = DEFAULT_INITIAL_SUPPLY)]
    pub initial_supply: u64,

    /// Skip deploying the second implementation
    #[arg(long)]
    pub skip_v2: bool,
}

/// Upgrade the proxy's implementation
#[derive(Args)]
pub struct UpgradeArgs {
    /// Address of the proxy admin contract, defaults to the deployments file
    #[arg(long)]
    pub proxy_admin: Option<String>,

    /// Address of the proxy contract, defaults to the deployments file
    #[arg(long)]
    pub proxy: Option<String>,

    /// Address of the new implementation contract
    #[arg(short, long, required_unless_present = "version", conflicts_with = "version")]
    pub implementation: Option<String>,

    /// Implementation version to look up in the deployments file
    #[arg(short, long, value_enum)]
    pub version: Option<ImplementationVersion>,

    /// Optional calldata, in hex form, which the proxy admin
    /// forwards to the proxy after upgrading
    #[arg(short, long)]
    pub calldata: Option<String>,
}

/// Transfer ownership of the proxy admin
#[derive(Args)]
pub struct TransferAdminArgs {
    /// Address of the proxy admin contract, defaults to the deployments file
    #[arg(long)]
    pub proxy_admin: Option<String>,

    /// Address of the new owner
    #[arg(short, long)]
    pub new_owner: String,
}

/// Inspect a deployed proxy
#[derive(Args)]
pub struct StatusArgs {
    /// Address of the proxy admin contract, defaults to the deployments file
    #[arg(long)]
    pub proxy_admin: Option<String>,

    /// Address of the proxy contract, defaults to the deployments file
    #[arg(long)]
    pub proxy: Option<String>,
}
