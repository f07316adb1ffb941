//! Definitions of errors that can occur during the execution of the proxy management scripts

use thiserror::Error;

/// Errors that can occur during the execution of the proxy management scripts
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Error reading a file from disk
    #[error("error reading file: {0}")]
    ReadFile(String),
    /// Error writing a file to disk
    #[error("error writing file: {0}")]
    WriteFile(String),
    /// Error parsing a compiled contract artifact
    #[error("error parsing artifact: {0}")]
    ArtifactParsing(String),
    /// The configured private key could not be turned into a signer
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    /// Error initializing the RPC client
    #[error("error initializing client: {0}")]
    ClientInitialization(String),
    /// Error constructing calldata or arguments for a contract method
    #[error("error constructing calldata: {0}")]
    CalldataConstruction(String),
    /// Error deploying a contract
    #[error("error deploying contract: {0}")]
    ContractDeployment(String),
    /// Error calling a contract method
    #[error("error interacting with contract: {0}")]
    ContractInteraction(String),
    /// A value read back after a transaction did not match what was written
    #[error("verification failed: {0}")]
    Verification(String),
}
