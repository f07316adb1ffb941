//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use clap::ValueEnum;

use crate::constants::{
    IMPLEMENTATION_V1_CONTRACT_KEY, IMPLEMENTATION_V2_CONTRACT_KEY, PROXY_ADMIN_CONTRACT_KEY,
    PROXY_CONTRACT_KEY,
};

/// The contracts making up an upgradeable token deployment
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeployedContract {
    /// The admin contract holding the upgrade rights
    ProxyAdmin,
    /// The first token implementation
    ImplementationV1,
    /// The second token implementation
    ImplementationV2,
    /// The transparent upgradeable proxy
    Proxy,
}

impl DeployedContract {
    /// The key under which the contract's address is stored in the deployments file
    pub fn deployments_key(&self) -> &'static str {
        match self {
            DeployedContract::ProxyAdmin => PROXY_ADMIN_CONTRACT_KEY,
            DeployedContract::ImplementationV1 => IMPLEMENTATION_V1_CONTRACT_KEY,
            DeployedContract::ImplementationV2 => IMPLEMENTATION_V2_CONTRACT_KEY,
            DeployedContract::Proxy => PROXY_CONTRACT_KEY,
        }
    }

    /// The name of the compiled artifact holding the contract's bytecode
    pub fn artifact_name(&self) -> &'static str {
        match self {
            DeployedContract::ProxyAdmin => "ProxyAdmin",
            DeployedContract::ImplementationV1 => "ImplementationV1",
            DeployedContract::ImplementationV2 => "ImplementationV2",
            DeployedContract::Proxy => "TransparentUpgradeableProxy",
        }
    }
}

impl Display for DeployedContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.artifact_name())
    }
}

/// The token implementation versions a proxy can point at
#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImplementationVersion {
    /// The first implementation
    V1,
    /// The second implementation
    V2,
}

impl ImplementationVersion {
    /// The deployed contract backing this version
    pub fn contract(&self) -> DeployedContract {
        match self {
            ImplementationVersion::V1 => DeployedContract::ImplementationV1,
            ImplementationVersion::V2 => DeployedContract::ImplementationV2,
        }
    }
}

impl Display for ImplementationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplementationVersion::V1 => write!(f, "V1"),
            ImplementationVersion::V2 => write!(f, "V2"),
        }
    }
}
