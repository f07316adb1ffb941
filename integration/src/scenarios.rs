//! Named scenarios, each a fixed sequence of steps

use alloy::primitives::U256;
use clap::ValueEnum;
use proxy_scripts::types::ImplementationVersion::{V1, V2};

use crate::{
    constants::{
        DEFAULT_INTRUDER_VALUE, DEFAULT_NEW_VALUE, DEFAULT_SOME_VALUE, DEFAULT_TRANSFER_AMOUNT,
    },
    errors::RejectionKind::{AlreadyInitialized, Unauthorized},
    steps::{InitPath, Operation, Step},
    system::Identity::{Deployer, NewOwner},
};

/// The scenarios the orchestrator can run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Read and mutate through V1, upgrade to V2, initialize and mutate V2
    BasicUpgrade,
    /// The basic upgrade, plus the negative authorization checks, ownership
    /// transfers, a rollback to V1 and a final hand-back to the deployer
    FullOwnershipTransferAndRollback,
}

/// The values a scenario writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioParams {
    /// Written to `someValue` before upgrading
    pub some_value: U256,
    /// Written to `newValue` after upgrading
    pub new_value: U256,
    /// Transferred from the deployer to the recipient
    pub transfer_amount: U256,
    /// Attempted by the previous owner once ownership is transferred
    pub intruder_value: U256,
    /// Overrides the scenario's default V2 initialization path
    pub init_path: Option<InitPath>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            some_value: U256::from(DEFAULT_SOME_VALUE),
            new_value: U256::from(DEFAULT_NEW_VALUE),
            transfer_amount: U256::from(DEFAULT_TRANSFER_AMOUNT),
            intruder_value: U256::from(DEFAULT_INTRUDER_VALUE),
            init_path: None,
        }
    }
}

impl ScenarioKind {
    /// The V2 initialization path used when none is configured
    pub fn default_init_path(&self) -> InitPath {
        match self {
            ScenarioKind::BasicUpgrade => InitPath::Direct,
            ScenarioKind::FullOwnershipTransferAndRollback => InitPath::ViaAdmin,
        }
    }

    /// Build the scenario's steps
    pub fn steps(&self, params: &ScenarioParams) -> Vec<Step> {
        let path = params.init_path.unwrap_or_else(|| self.default_init_path());
        match self {
            ScenarioKind::BasicUpgrade => basic_upgrade(params, path),
            ScenarioKind::FullOwnershipTransferAndRollback => {
                full_ownership_transfer_and_rollback(params, path)
            }
        }
    }
}

/// Steps shared by both scenarios before the upgrade
fn pre_upgrade(params: &ScenarioParams) -> Vec<Step> {
    vec![
        Step::succeed(Operation::ResolveIdentities),
        Step::probe(Operation::ProbeImplementation(V1)),
        Step::probe(Operation::ProbeImplementation(V2)),
        Step::succeed(Operation::ReadProxy),
        Step::succeed(Operation::SetSomeValue { caller: Deployer, value: params.some_value }),
        Step::succeed(Operation::Transfer { amount: params.transfer_amount }),
    ]
}

fn basic_upgrade(params: &ScenarioParams, path: InitPath) -> Vec<Step> {
    let mut steps = pre_upgrade(params);
    steps.extend([
        Step::succeed(Operation::Upgrade { caller: Deployer, target: V2 }),
        Step::succeed(Operation::CheckStorageContinuity),
        Step::succeed(Operation::InitializeV2 { caller: Deployer, path }),
        Step::succeed(Operation::SetNewValue { caller: Deployer, value: params.new_value }),
        Step::succeed(Operation::CheckStorageContinuity),
        Step::succeed(Operation::ReadProxy),
    ]);

    steps
}

fn full_ownership_transfer_and_rollback(params: &ScenarioParams, path: InitPath) -> Vec<Step> {
    // The second initialization takes the other path, so both are exercised
    let retry_path = match path {
        InitPath::Direct => InitPath::ViaAdmin,
        InitPath::ViaAdmin => InitPath::Direct,
    };

    let mut steps = pre_upgrade(params);
    steps.extend([
        // Only the admin owner may upgrade
        Step::reject(Operation::Upgrade { caller: NewOwner, target: V2 }, Unauthorized),
        Step::succeed(Operation::Upgrade { caller: Deployer, target: V2 }),
        Step::succeed(Operation::CheckStorageContinuity),
        Step::succeed(Operation::InitializeV2 { caller: Deployer, path }),
        Step::reject(
            Operation::InitializeV2 { caller: Deployer, path: retry_path },
            AlreadyInitialized,
        ),
        Step::succeed(Operation::SetNewValue { caller: Deployer, value: params.new_value }),
        Step::succeed(Operation::CheckStorageContinuity),
        Step::succeed(Operation::ReadProxy),
        // Hand everything over to the new owner
        Step::succeed(Operation::TransferTokenOwnership { caller: Deployer, to: NewOwner }),
        Step::succeed(Operation::TransferAdminOwnership { caller: Deployer, to: NewOwner }),
        Step::reject(Operation::Upgrade { caller: Deployer, target: V1 }, Unauthorized),
        Step::succeed(Operation::Upgrade { caller: NewOwner, target: V2 }),
        Step::reject(
            Operation::SetSomeValue { caller: Deployer, value: params.intruder_value },
            Unauthorized,
        ),
        // Roll back to V1
        Step::succeed(Operation::Upgrade { caller: NewOwner, target: V1 }),
        Step::succeed(Operation::ReadProxy),
        Step::succeed(Operation::CheckStorageContinuity),
        // Restore the deployer as owner of both contracts
        Step::succeed(Operation::TransferAdminOwnership { caller: NewOwner, to: Deployer }),
        Step::succeed(Operation::TransferTokenOwnership { caller: NewOwner, to: Deployer }),
    ]);

    steps
}
