//! Resolution of the orchestrator's configuration

use std::{
    fmt::{self, Debug},
    path::Path,
    str::FromStr,
    time::Duration,
};

use alloy::primitives::Address;
use proxy_scripts::{types::DeployedContract, utils::parse_addr_from_deployments_file};
use thiserror::Error;

use crate::{cli::ConfigArgs, system::ContractSet};

/// Errors resolving the configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting holds something other than an address
    #[error("invalid {setting} `{value}`: {reason}")]
    InvalidAddress {
        /// The setting
        setting: &'static str,
        /// The value given
        value: String,
        /// Why it failed to parse
        reason: String,
    },
    /// A contract address was given nowhere
    #[error("no {setting} configured: pass {flag}, set {env}, or record it in {path}")]
    Missing {
        /// The setting
        setting: &'static str,
        /// The flag setting it
        flag: &'static str,
        /// The environment variable setting it
        env: &'static str,
        /// The deployments file that was consulted
        path: String,
    },
}

/// A contract address setting and the places it can come from
struct AddressSetting {
    /// Human-readable name
    name: &'static str,
    /// CLI flag
    flag: &'static str,
    /// Environment variable
    env: &'static str,
    /// Entry in the deployments file
    contract: DeployedContract,
}

const PROXY_ADMIN: AddressSetting = AddressSetting {
    name: "proxy admin address",
    flag: "--proxy-admin",
    env: "PROXY_ADMIN_ADDRESS",
    contract: DeployedContract::ProxyAdmin,
};

const IMPLEMENTATION_V1: AddressSetting = AddressSetting {
    name: "V1 implementation address",
    flag: "--implementation-v1",
    env: "IMPLEMENTATION_V1_ADDRESS",
    contract: DeployedContract::ImplementationV1,
};

const IMPLEMENTATION_V2: AddressSetting = AddressSetting {
    name: "V2 implementation address",
    flag: "--implementation-v2",
    env: "IMPLEMENTATION_V2_ADDRESS",
    contract: DeployedContract::ImplementationV2,
};

const PROXY: AddressSetting = AddressSetting {
    name: "proxy address",
    flag: "--proxy",
    env: "PROXY_ADDRESS",
    contract: DeployedContract::Proxy,
};

/// The settings a run is started with, fixed for its duration
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Node RPC URL
    pub rpc_url: String,
    /// Private key of the deployer
    pub deployer_key: String,
    /// Private key of the new owner
    pub new_owner_key: String,
    /// The deployed contracts
    pub contracts: ContractSet,
    /// Recipient of the token transfer, the new owner if unset
    pub recipient: Option<Address>,
    /// Bound on waiting for each transaction to be confirmed
    pub confirmation_timeout: Duration,
}

impl OrchestratorConfig {
    /// Resolve the configuration, falling back to the deployments file for
    /// contract addresses not given as flags or environment variables
    pub fn from_args(args: ConfigArgs) -> Result<Self, ConfigError> {
        let deployments = args.deployments.as_path();
        let contracts = ContractSet {
            proxy_admin: resolve(args.proxy_admin.as_deref(), &PROXY_ADMIN, deployments)?,
            implementation_v1: resolve(
                args.implementation_v1.as_deref(),
                &IMPLEMENTATION_V1,
                deployments,
            )?,
            implementation_v2: resolve(
                args.implementation_v2.as_deref(),
                &IMPLEMENTATION_V2,
                deployments,
            )?,
            proxy: resolve(args.proxy.as_deref(), &PROXY, deployments)?,
        };

        let recipient = args
            .recipient
            .as_deref()
            .map(|value| parse_address("recipient address", value))
            .transpose()?;

        Ok(Self {
            rpc_url: args.rpc_url,
            deployer_key: args.priv_key,
            new_owner_key: args.new_owner_key,
            contracts,
            recipient,
            confirmation_timeout: Duration::from_secs(args.confirmation_timeout_secs),
        })
    }
}

impl Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("rpc_url", &self.rpc_url)
            .field("deployer_key", &"<redacted>")
            .field("new_owner_key", &"<redacted>")
            .field("contracts", &self.contracts)
            .field("recipient", &self.recipient)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish()
    }
}

/// Take an address from its explicit value, or else from the deployments file
fn resolve(
    value: Option<&str>,
    setting: &AddressSetting,
    deployments: &Path,
) -> Result<Address, ConfigError> {
    match value {
        Some(value) => parse_address(setting.name, value),
        None => parse_addr_from_deployments_file(deployments, setting.contract.deployments_key())
            .map_err(|_| ConfigError::Missing {
                setting: setting.name,
                flag: setting.flag,
                env: setting.env,
                path: deployments.display().to_string(),
            }),
    }
}

fn parse_address(setting: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|e| ConfigError::InvalidAddress {
        setting,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
