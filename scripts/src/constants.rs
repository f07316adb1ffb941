//! Constants used in the proxy management scripts

use alloy_primitives::{b256, B256};

/// The default RPC URL, pointing at a local Anvil / Hardhat devnet
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// The default private key, the first prefunded account of an Anvil devnet
pub const DEFAULT_DEVNET_PKEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// The second prefunded account of an Anvil devnet, used as the default new owner
pub const DEFAULT_DEVNET_NEW_OWNER_PKEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default directory containing compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// The storage slot containing the proxy admin address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The storage slot containing the implementation address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The extension of a compiled contract artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The deployments key in the deployments file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The proxy admin contract key in the deployments file
pub const PROXY_ADMIN_CONTRACT_KEY: &str = "proxy_admin_contract";

/// The V1 implementation contract key in the deployments file
pub const IMPLEMENTATION_V1_CONTRACT_KEY: &str = "implementation_v1_contract";

/// The V2 implementation contract key in the deployments file
pub const IMPLEMENTATION_V2_CONTRACT_KEY: &str = "implementation_v2_contract";

/// The upgradeable proxy contract key in the deployments file
pub const PROXY_CONTRACT_KEY: &str = "proxy_contract";

/// The default name of the token initialized behind the proxy
pub const DEFAULT_TOKEN_NAME: &str = "Upgradeable Token";

/// The default symbol of the token initialized behind the proxy
pub const DEFAULT_TOKEN_SYMBOL: &str = "UPT";

/// The default initial supply minted to the deployer
pub const DEFAULT_INITIAL_SUPPLY: u64 = 1000;

/// The environment variable holding the log filter directives
pub const LOG_FILTER_ENV_VAR: &str = "UPGRADE_LOG";

/// The log filter used when none is configured
pub const DEFAULT_LOG_FILTER: &str = "info";
