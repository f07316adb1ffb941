//! Error types raised while orchestrating a proxy upgrade

use std::fmt::{self, Display};

use alloy::primitives::hex;
use alloy_sol_types::{Revert, SolError};
use proxy_scripts::solidity::{InvalidInitialization, OwnableUnauthorizedAccount};
use thiserror::Error;

use crate::constants::{
    EXECUTION_REVERTED_PREFIX, LEGACY_ALREADY_INITIALIZED_REASON, LEGACY_UNAUTHORIZED_REASON,
};

/// The contract rejections a step can be expected to hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The caller lacks the owner or admin role
    Unauthorized,
    /// An initializer ran a second time
    AlreadyInitialized,
}

impl Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::Unauthorized => write!(f, "Unauthorized"),
            RejectionKind::AlreadyInitialized => write!(f, "AlreadyInitialized"),
        }
    }
}

/// Errors surfaced by the remote contract system
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// A configured private key does not yield an account
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    /// The contract rejected the caller for lacking a role
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The contract rejected a repeated initialization
    #[error("already initialized: {0}")]
    AlreadyInitialized(String),
    /// A transaction was not confirmed in time
    #[error("timed out: {0}")]
    Timeout(String),
    /// Any other contract rejection, with the decoded reason if there was one
    #[error("reverted: {message}")]
    Reverted {
        /// The message reported by the node
        message: String,
        /// The decoded revert reason
        reason: Option<String>,
    },
    /// Connectivity, transport or decoding failure
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl ChainError {
    /// The rejection this error represents, if any
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            ChainError::Unauthorized(_) => Some(RejectionKind::Unauthorized),
            ChainError::AlreadyInitialized(_) => Some(RejectionKind::AlreadyInitialized),
            _ => None,
        }
    }
}

/// Errors raised while executing a single operation
#[derive(Debug, Error)]
pub enum OperationError {
    /// A remote call failed
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// A value read back did not match what the operation expected
    #[error("{what}: expected {expected}, found {actual}")]
    Mismatch {
        /// The value being checked
        what: String,
        /// The expected value
        expected: String,
        /// The value actually read
        actual: String,
    },
}

/// Errors that abort an orchestrated run
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A step that should have succeeded failed
    #[error("step {step} ({label}) failed: {source}")]
    UnexpectedFailure {
        /// The 1-based index of the failing step
        step: usize,
        /// The step's description
        label: String,
        /// The underlying failure
        source: OperationError,
    },
    /// A step that should have been rejected went through
    #[error("step {step} ({label}) succeeded, expected it to fail with {expected}")]
    ExpectationViolated {
        /// The 1-based index of the step
        step: usize,
        /// The step's description
        label: String,
        /// The rejection that did not happen
        expected: RejectionKind,
    },
    /// A step failed, but not with the rejection it was expected to hit
    #[error("step {step} ({label}) expected to fail with {expected}, failed with: {source}")]
    WrongFailure {
        /// The 1-based index of the step
        step: usize,
        /// The step's description
        label: String,
        /// The rejection that was expected
        expected: RejectionKind,
        /// The failure that happened instead
        source: OperationError,
    },
}

impl OrchestratorError {
    /// The 1-based index of the step that aborted the run
    pub fn step(&self) -> usize {
        match self {
            OrchestratorError::UnexpectedFailure { step, .. }
            | OrchestratorError::ExpectationViolated { step, .. }
            | OrchestratorError::WrongFailure { step, .. } => *step,
        }
    }
}

/// Classify a contract rejection from the node's message and any revert data.
///
/// Custom error selectors take precedence, then `Error(string)` reasons, then
/// the node's message.
pub fn classify_revert(message: &str, data: Option<&[u8]>) -> ChainError {
    let message = message.to_string();
    if let Some(data) = data.filter(|d| !d.is_empty()) {
        if data.starts_with(&OwnableUnauthorizedAccount::SELECTOR) {
            return ChainError::Unauthorized(message);
        }
        if data.starts_with(&InvalidInitialization::SELECTOR) {
            return ChainError::AlreadyInitialized(message);
        }
        if let Ok(revert) = Revert::abi_decode(data, true) {
            return classify_reason(message, revert.reason);
        }

        let selector = hex::encode_prefixed(&data[..data.len().min(4)]);
        return ChainError::Reverted { message, reason: Some(format!("custom error {selector}")) };
    }

    let reason = message
        .split_once(EXECUTION_REVERTED_PREFIX)
        .map(|(_, reason)| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());

    match reason {
        Some(reason) => classify_reason(message, reason),
        None if mentions_rejection(&message).is_some() => classify_reason(message.clone(), message),
        None => ChainError::Reverted { message, reason: None },
    }
}

/// Classify a decoded revert reason
fn classify_reason(message: String, reason: String) -> ChainError {
    match mentions_rejection(&reason) {
        Some(RejectionKind::Unauthorized) => ChainError::Unauthorized(message),
        Some(RejectionKind::AlreadyInitialized) => ChainError::AlreadyInitialized(message),
        None => ChainError::Reverted { message, reason: Some(reason) },
    }
}

/// Match a reason against the legacy revert strings
fn mentions_rejection(reason: &str) -> Option<RejectionKind> {
    let reason = reason.to_lowercase();
    if reason.contains(LEGACY_UNAUTHORIZED_REASON) {
        Some(RejectionKind::Unauthorized)
    } else if reason.contains(LEGACY_ALREADY_INITIALIZED_REASON) {
        Some(RejectionKind::AlreadyInitialized)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;
    use alloy_sol_types::{Revert, SolError};
    use proxy_scripts::solidity::{InvalidInitialization, OwnableUnauthorizedAccount};

    use super::{classify_revert, ChainError, RejectionKind};

    #[test]
    fn test_custom_error_selectors() {
        let data = OwnableUnauthorizedAccount { account: Address::repeat_byte(0x02) }.abi_encode();
        let err = classify_revert("execution reverted", Some(&data));
        assert_eq!(err.rejection_kind(), Some(RejectionKind::Unauthorized));

        let data = InvalidInitialization {}.abi_encode();
        let err = classify_revert("execution reverted", Some(&data));
        assert_eq!(err.rejection_kind(), Some(RejectionKind::AlreadyInitialized));
    }

    #[test]
    fn test_legacy_reason_strings() {
        let data = Revert::from("Ownable: caller is not the owner").abi_encode();
        let err = classify_revert("execution reverted", Some(&data));
        assert_eq!(err.rejection_kind(), Some(RejectionKind::Unauthorized));

        let data = Revert::from("Initializable: contract is already initialized").abi_encode();
        let err = classify_revert("execution reverted", Some(&data));
        assert_eq!(err.rejection_kind(), Some(RejectionKind::AlreadyInitialized));
    }

    #[test]
    fn test_reason_in_node_message() {
        let err =
            classify_revert("execution reverted: Ownable: caller is not the owner", None);
        assert_eq!(err.rejection_kind(), Some(RejectionKind::Unauthorized));

        let err = classify_revert("execution reverted: ERC20: insufficient balance", None);
        match err {
            ChainError::Reverted { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("ERC20: insufficient balance"))
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_reasonless_revert() {
        let err = classify_revert("execution reverted", None);
        assert!(matches!(err, ChainError::Reverted { reason: None, .. }));

        let err = classify_revert("execution reverted", Some(&[]));
        assert!(matches!(err, ChainError::Reverted { reason: None, .. }));
    }

    #[test]
    fn test_unknown_custom_error() {
        let err = classify_revert("execution reverted", Some(&[0xde, 0xad, 0xbe, 0xef, 0x00]));
        match err {
            ChainError::Reverted { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("custom error 0xdeadbeef"))
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
