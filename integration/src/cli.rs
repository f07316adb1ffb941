//! Definition of the CLI arguments for the upgrade orchestrator

use std::path::PathBuf;

use alloy::primitives::U256;
use clap::{Args, Parser};
use proxy_scripts::constants::{
    DEFAULT_DEPLOYMENTS_PATH, DEFAULT_DEVNET_NEW_OWNER_PKEY, DEFAULT_DEVNET_PKEY, DEFAULT_RPC_URL,
};

use crate::{
    constants::{
        DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_INTRUDER_VALUE, DEFAULT_NEW_VALUE,
        DEFAULT_SOME_VALUE, DEFAULT_TRANSFER_AMOUNT,
    },
    scenarios::{ScenarioKind, ScenarioParams},
    steps::InitPath,
};

/// Drive an upgradeable token through upgrades and ownership transfers
/// against a running node.
///
/// Assumes the proxy admin, both implementations and the proxy have already
/// been deployed, e.g. with `scripts deploy`.
#[derive(Parser)]
pub(crate) struct Cli {
    /// The scenario to run
    #[arg(short, long, value_enum, default_value_t = ScenarioKind::FullOwnershipTransferAndRollback)]
    pub(crate) scenario: ScenarioKind,

    /// Where to connect and which contracts to drive
    #[command(flatten)]
    pub(crate) config: ConfigArgs,

    /// The values the scenario writes
    #[command(flatten)]
    pub(crate) params: ScenarioArgs,
}

/// Connection, identity and contract settings
#[derive(Args, Clone)]
pub(crate) struct ConfigArgs {
    /// Node RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub(crate) rpc_url: String,

    /// Private key of the deployer, defaults to the first devnet account
    #[arg(short, long, env = "PRIVATE_KEY", default_value = DEFAULT_DEVNET_PKEY, hide_default_value = true)]
    pub(crate) priv_key: String,

    /// Private key of the new owner, defaults to the second devnet account
    #[arg(long, env = "NEW_OWNER_PRIVATE_KEY", default_value = DEFAULT_DEVNET_NEW_OWNER_PKEY, hide_default_value = true)]
    pub(crate) new_owner_key: String,

    /// Address of the proxy admin
    #[arg(long, env = "PROXY_ADMIN_ADDRESS")]
    pub(crate) proxy_admin: Option<String>,

    /// Address of the first implementation
    #[arg(long, env = "IMPLEMENTATION_V1_ADDRESS")]
    pub(crate) implementation_v1: Option<String>,

    /// Address of the second implementation
    #[arg(long, env = "IMPLEMENTATION_V2_ADDRESS")]
    pub(crate) implementation_v2: Option<String>,

    /// Address of the proxy
    #[arg(long, env = "PROXY_ADDRESS")]
    pub(crate) proxy: Option<String>,

    /// Recipient of the token transfer, defaults to the new owner
    #[arg(long, env = "RECIPIENT_ADDRESS")]
    pub(crate) recipient: Option<String>,

    /// Seconds to wait for each transaction to be confirmed
    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value_t = DEFAULT_CONFIRMATION_TIMEOUT_SECS)]
    pub(crate) confirmation_timeout_secs: u64,

    /// Deployments file to read contract addresses from when not given explicitly
    #[arg(short, long, env = "DEPLOYMENTS_PATH", default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub(crate) deployments: PathBuf,
}

/// Values written by the scenario
#[derive(Args, Clone)]
pub(crate) struct ScenarioArgs {
    /// Value written to `someValue` before upgrading
    #[arg(long, default_value_t = DEFAULT_SOME_VALUE)]
    pub(crate) some_value: u64,

    /// Value written to `newValue` after upgrading
    #[arg(long, default_value_t = DEFAULT_NEW_VALUE)]
    pub(crate) new_value: u64,

    /// Amount of tokens transferred to the recipient
    #[arg(long, default_value_t = DEFAULT_TRANSFER_AMOUNT)]
    pub(crate) transfer_amount: u64,

    /// Value the previous owner attempts to write after losing ownership
    #[arg(long, default_value_t = DEFAULT_INTRUDER_VALUE)]
    pub(crate) intruder_value: u64,

    /// How `initializeV2` reaches the proxy, defaults per scenario
    #[arg(long, value_enum)]
    pub(crate) init_path: Option<InitPath>,
}

impl From<ScenarioArgs> for ScenarioParams {
    fn from(args: ScenarioArgs) -> Self {
        Self {
            some_value: U256::from(args.some_value),
            new_value: U256::from(args.new_value),
            transfer_amount: U256::from(args.transfer_amount),
            intruder_value: U256::from(args.intruder_value),
            init_path: args.init_path,
        }
    }
}
