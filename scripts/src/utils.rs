//! Utilities for the proxy management scripts.

use std::{fs, path::Path, str::FromStr};

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{
    constants::{
        ARTIFACT_EXTENSION, DEPLOYMENTS_KEY, IMPLEMENTATION_STORAGE_SLOT, NUM_BYTES_ADDRESS,
        NUM_BYTES_STORAGE_SLOT, PROXY_ADMIN_STORAGE_SLOT,
    },
    errors::ScriptError,
    types::DeployedContract,
};

// ----------
// | Client |
// ----------

/// Parse a hex-encoded private key into a local signer
pub fn parse_signer(priv_key: &str) -> Result<PrivateKeySigner, ScriptError> {
    PrivateKeySigner::from_str(priv_key.trim()).map_err(|e| ScriptError::InvalidKey(e.to_string()))
}

/// Sets up an RPC client which signs transactions with the given private key
pub async fn setup_client(priv_key: &str, rpc_url: &str) -> Result<DynProvider, ScriptError> {
    let signer = parse_signer(priv_key)?;
    connect_signer(signer, rpc_url).await
}

/// Connects a signer to the given RPC URL, checking that the node is reachable
pub async fn connect_signer(
    signer: PrivateKeySigner,
    rpc_url: &str,
) -> Result<DynProvider, ScriptError> {
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let address = signer.address();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .on_http(url);

    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    info!(%address, chain_id, "connected to {rpc_url}");

    Ok(DynProvider::new(provider))
}

/// Parse a hex-encoded address
pub fn parse_address(address: &str) -> Result<Address, ScriptError> {
    Address::from_str(address.trim())
        .map_err(|e| ScriptError::CalldataConstruction(format!("invalid address {address}: {e}")))
}

/// Check that a mined transaction succeeded
pub fn check_receipt(receipt: &TransactionReceipt, what: &str) -> Result<(), ScriptError> {
    if receipt.status() {
        Ok(())
    } else {
        Err(ScriptError::ContractInteraction(format!(
            "{what} reverted in tx {}",
            receipt.transaction_hash
        )))
    }
}

// --------------------
// | Deployments File |
// --------------------

/// Read and parse a JSON file
pub fn get_json_from_file(file_path: &Path) -> Result<Value, ScriptError> {
    let contents = fs::read_to_string(file_path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", file_path.display())))?;

    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", file_path.display())))
}

/// Read the address stored under the given key in the deployments file
pub fn parse_addr_from_deployments_file(
    file_path: &Path,
    contract_key: &str,
) -> Result<Address, ScriptError> {
    let parsed_json = get_json_from_file(file_path)?;
    let addr = parsed_json[DEPLOYMENTS_KEY][contract_key]
        .as_str()
        .ok_or_else(|| {
            ScriptError::ReadFile(format!(
                "no `{contract_key}` address in deployments file {}",
                file_path.display()
            ))
        })?;

    parse_address(addr)
}

/// Write a deployed contract's address into the deployments file,
/// creating the file if it does not exist yet
pub fn write_deployed_address(
    file_path: &Path,
    contract_key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    let mut parsed_json = if file_path.exists() {
        get_json_from_file(file_path)?
    } else {
        Value::Object(Default::default())
    };

    if !parsed_json.is_object()
        || !(parsed_json[DEPLOYMENTS_KEY].is_null() || parsed_json[DEPLOYMENTS_KEY].is_object())
    {
        return Err(ScriptError::WriteFile(format!(
            "deployments file {} is not a JSON object",
            file_path.display()
        )));
    }
    parsed_json[DEPLOYMENTS_KEY][contract_key] = Value::String(format!("{address:#x}"));

    let contents = serde_json::to_string_pretty(&parsed_json)
        .map_err(|e| ScriptError::WriteFile(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| ScriptError::WriteFile(e.to_string()))
}

/// Use the address given on the command line if present, otherwise look the
/// contract up in the deployments file
pub fn resolve_address(
    arg: Option<&str>,
    deployments_path: &Path,
    contract: DeployedContract,
) -> Result<Address, ScriptError> {
    match arg {
        Some(addr) => parse_address(addr),
        None => parse_addr_from_deployments_file(deployments_path, contract.deployments_key()),
    }
}

// -------------
// | Artifacts |
// -------------

/// The subset of a compiled contract artifact the scripts need
#[derive(Deserialize)]
struct ContractArtifact {
    /// The creation bytecode
    bytecode: ArtifactBytecode,
}

/// Creation bytecode as laid out by the different toolchains
#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    /// Truffle, TronBox and Hardhat store a bare hex string
    Hex(String),
    /// Foundry nests the hex string under `object`
    Object {
        /// The hex-encoded bytecode
        object: String,
    },
}

/// Extract the creation bytecode from the contents of a compiled artifact
pub fn parse_artifact_bytecode(contents: &str) -> Result<Bytes, ScriptError> {
    let artifact: ContractArtifact =
        serde_json::from_str(contents).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    let hex_code = match artifact.bytecode {
        ArtifactBytecode::Hex(code) => code,
        ArtifactBytecode::Object { object } => object,
    };

    let code =
        Bytes::from_str(&hex_code).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    if code.is_empty() {
        // Interfaces and abstract contracts compile to empty bytecode
        return Err(ScriptError::ArtifactParsing(
            "artifact contains no bytecode".to_string(),
        ));
    }

    Ok(code)
}

/// Load the creation bytecode of the given contract from the artifacts directory
pub fn load_artifact_bytecode(
    artifacts_dir: &Path,
    contract: DeployedContract,
) -> Result<Bytes, ScriptError> {
    let path = artifacts_dir
        .join(contract.artifact_name())
        .with_extension(ARTIFACT_EXTENSION);
    let contents = fs::read_to_string(&path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))?;

    parse_artifact_bytecode(&contents)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))
}

// --------------
// | Deployment |
// --------------

/// Deploy the given creation code (with any constructor arguments appended)
/// and wait for the contract address
pub async fn deploy_bytecode(client: &DynProvider, code: Bytes) -> Result<Address, ScriptError> {
    let tx = TransactionRequest::default().with_deploy_code(code);
    let pending_tx = client
        .send_transaction(tx)
        .await
        .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

    let tx_hash = *pending_tx.tx_hash();
    info!(%tx_hash, "waiting for deployment tx to be mined");
    let receipt = pending_tx
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

    if !receipt.status() {
        return Err(ScriptError::ContractDeployment(format!(
            "deployment tx {tx_hash} reverted"
        )));
    }

    receipt.contract_address.ok_or_else(|| {
        ScriptError::ContractDeployment(format!("no contract address in receipt of {tx_hash}"))
    })
}

// -------------------
// | EIP-1967 Slots |
// -------------------

/// Extract the address stored in the low-order bytes of a storage word
pub fn address_from_storage_word(word: U256) -> Address {
    let bytes = word.to_be_bytes::<NUM_BYTES_STORAGE_SLOT>();
    Address::from_slice(&bytes[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..])
}

/// Read an address out of the given storage slot of a contract
pub async fn read_address_slot(
    client: &DynProvider,
    contract: Address,
    slot: B256,
) -> Result<Address, ScriptError> {
    let word = client
        .get_storage_at(contract, U256::from_be_bytes(slot.0))
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    Ok(address_from_storage_word(word))
}

/// Read the implementation address a proxy currently delegates to
pub async fn read_implementation(
    client: &DynProvider,
    proxy: Address,
) -> Result<Address, ScriptError> {
    read_address_slot(client, proxy, IMPLEMENTATION_STORAGE_SLOT).await
}

/// Read the admin address of a proxy
///
/// This is the recommended way to get the proxy admin address:
/// https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
pub async fn read_proxy_admin(client: &DynProvider, proxy: Address) -> Result<Address, ScriptError> {
    read_address_slot(client, proxy, PROXY_ADMIN_STORAGE_SLOT).await
}
