//! Step descriptors run by the orchestrator

use std::fmt::{self, Display};

use alloy::primitives::U256;
use clap::ValueEnum;
use proxy_scripts::types::ImplementationVersion;

use crate::{errors::RejectionKind, system::Identity};

/// How `initializeV2` reaches the proxy
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPath {
    /// Called directly on the proxy
    Direct,
    /// Forwarded by the proxy admin through `callProxy`
    ViaAdmin,
}

/// A single remote operation, together with the checks run after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Derive the identities' addresses and check the proxy points at a known implementation
    ResolveIdentities,
    /// Read `name` and `symbol` directly from an implementation contract
    ProbeImplementation(ImplementationVersion),
    /// Read the token state through the proxy
    ReadProxy,
    /// Write `someValue` and read it back
    SetSomeValue { caller: Identity, value: U256 },
    /// Transfer tokens from the deployer to the recipient and check both balances
    Transfer { amount: U256 },
    /// Repoint the proxy and check the implementation slot
    Upgrade { caller: Identity, target: ImplementationVersion },
    /// Run the V2 initializer
    InitializeV2 { caller: Identity, path: InitPath },
    /// Write `newValue` and read it back
    SetNewValue { caller: Identity, value: U256 },
    /// Check `someValue` still holds the last value written
    CheckStorageContinuity,
    /// Hand over ownership of the token
    TransferTokenOwnership { caller: Identity, to: Identity },
    /// Hand over ownership of the proxy admin
    TransferAdminOwnership { caller: Identity, to: Identity },
}

impl Operation {
    /// The piece of state an expected rejection of this operation must leave untouched
    pub fn guard(&self) -> Option<Guard> {
        match self {
            Operation::SetSomeValue { .. } => Some(Guard::SomeValue),
            Operation::Upgrade { .. } => Some(Guard::Implementation),
            Operation::InitializeV2 { .. } | Operation::SetNewValue { .. } => Some(Guard::NewValue),
            Operation::TransferTokenOwnership { .. } => Some(Guard::TokenOwner),
            Operation::TransferAdminOwnership { .. } => Some(Guard::AdminOwner),
            _ => None,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ResolveIdentities => write!(f, "resolve identities"),
            Operation::ProbeImplementation(version) => {
                write!(f, "probe implementation {version} directly")
            }
            Operation::ReadProxy => write!(f, "read token through proxy"),
            Operation::SetSomeValue { caller, value } => {
                write!(f, "set someValue to {value} as {caller}")
            }
            Operation::Transfer { amount } => write!(f, "transfer {amount} tokens to recipient"),
            Operation::Upgrade { caller, target } => {
                write!(f, "upgrade proxy to {target} as {caller}")
            }
            Operation::InitializeV2 { caller, path: InitPath::Direct } => {
                write!(f, "initialize V2 directly as {caller}")
            }
            Operation::InitializeV2 { caller, path: InitPath::ViaAdmin } => {
                write!(f, "initialize V2 via proxy admin as {caller}")
            }
            Operation::SetNewValue { caller, value } => {
                write!(f, "set newValue to {value} as {caller}")
            }
            Operation::CheckStorageContinuity => write!(f, "check storage continuity"),
            Operation::TransferTokenOwnership { caller, to } => {
                write!(f, "transfer token ownership from {caller} to {to}")
            }
            Operation::TransferAdminOwnership { caller, to } => {
                write!(f, "transfer proxy admin ownership from {caller} to {to}")
            }
        }
    }
}

/// State read before and after an expected rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// `getSomeValue()` through the proxy
    SomeValue,
    /// `getNewValue()` through the proxy
    NewValue,
    /// The proxy's implementation slot
    Implementation,
    /// The token owner
    TokenOwner,
    /// The proxy admin owner
    AdminOwner,
}

impl Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::SomeValue => write!(f, "someValue"),
            Guard::NewValue => write!(f, "newValue"),
            Guard::Implementation => write!(f, "proxy implementation"),
            Guard::TokenOwner => write!(f, "token owner"),
            Guard::AdminOwner => write!(f, "proxy admin owner"),
        }
    }
}

/// What a step's outcome must be for the run to continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// The operation must succeed
    Succeed,
    /// The operation may fail, failures are logged and the run continues
    Probe,
    /// The operation must be rejected with the given kind and leave its guarded state intact
    Reject(RejectionKind),
}

/// A step in an orchestrated run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The operation to run
    pub operation: Operation,
    /// The required outcome
    pub expectation: Expectation,
}

impl Step {
    /// A step that must succeed
    pub fn succeed(operation: Operation) -> Self {
        Self { operation, expectation: Expectation::Succeed }
    }

    /// A step whose failure is tolerated
    pub fn probe(operation: Operation) -> Self {
        Self { operation, expectation: Expectation::Probe }
    }

    /// A step that must be rejected
    pub fn reject(operation: Operation, kind: RejectionKind) -> Self {
        Self { operation, expectation: Expectation::Reject(kind) }
    }
}
