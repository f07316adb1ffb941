//! The driver loop running a sequence of steps against a proxy system

use std::fmt::{self, Display};

use alloy::primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use itertools::Itertools;
use proxy_scripts::{solidity::IImplementationV2, types::ImplementationVersion};
use tracing::{error, info, warn};

use crate::{
    errors::{ChainError, OperationError, OrchestratorError, RejectionKind},
    steps::{Expectation, Guard, InitPath, Operation, Step},
    system::{ContractHandle, ContractSet, Identity, ProxySystem},
};

/// The outcome of a step that did not abort the run
#[derive(Debug)]
pub enum StepOutcome {
    /// The step succeeded
    Passed,
    /// A probe failed, with the failure's message
    ProbeFailed(String),
    /// The step was rejected as expected
    ExpectedFailure(ChainError),
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Passed => write!(f, "passed"),
            StepOutcome::ProbeFailed(msg) => write!(f, "probe failed ({msg})"),
            StepOutcome::ExpectedFailure(err) => write!(f, "rejected as expected ({err})"),
        }
    }
}

/// The record of a single step
#[derive(Debug)]
pub struct StepRecord {
    /// The 1-based index of the step
    pub index: usize,
    /// The step's description
    pub label: String,
    /// What happened
    pub outcome: StepOutcome,
}

/// The result of a completed run
#[derive(Debug, Default)]
pub struct RunReport {
    /// One record per step, in order
    pub records: Vec<StepRecord>,
}

impl RunReport {
    /// A one-line tally of the step outcomes
    pub fn summary(&self) -> String {
        let counts = self.records.iter().counts_by(|r| match r.outcome {
            StepOutcome::Passed => "passed",
            StepOutcome::ProbeFailed(_) => "probe failures",
            StepOutcome::ExpectedFailure(_) => "expected rejections",
        });

        let tally = ["passed", "expected rejections", "probe failures"]
            .into_iter()
            .filter_map(|k| counts.get(k).map(|n| format!("{n} {k}")))
            .join(", ");
        format!("{} steps: {tally}", self.records.len())
    }
}

/// Values confirmed earlier in the run
#[derive(Debug, Default)]
struct RunState {
    /// The last confirmed `someValue`
    some_value: Option<U256>,
}

/// Runs steps in order against a proxy system, aborting on the first
/// unexpected outcome
pub struct UpgradeOrchestrator<'a, S> {
    /// The remote system
    system: &'a S,
    /// The deployed contracts
    contracts: ContractSet,
    /// The recipient of token transfers, the new owner if unset
    recipient: Option<Address>,
}

impl<'a, S: ProxySystem> UpgradeOrchestrator<'a, S> {
    /// Constructor
    pub fn new(system: &'a S, contracts: ContractSet, recipient: Option<Address>) -> Self {
        Self { system, contracts, recipient }
    }

    /// Run the steps in order.
    ///
    /// Returns at the first step whose outcome does not match its
    /// expectation; no later step is started.
    pub async fn run(&self, steps: &[Step]) -> Result<RunReport, OrchestratorError> {
        let mut state = RunState::default();
        let mut report = RunReport::default();

        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let label = step.operation.to_string();
            info!(step = index, "{label}");

            let outcome = self.run_step(index, &label, step, &mut state).await.map_err(|e| {
                error!(step = index, "{e}");
                e
            })?;
            report.records.push(StepRecord { index, label, outcome });
        }

        Ok(report)
    }

    /// Run a single step and hold its outcome against the expectation
    async fn run_step(
        &self,
        step: usize,
        label: &str,
        Step { operation, expectation }: &Step,
        state: &mut RunState,
    ) -> Result<StepOutcome, OrchestratorError> {
        let unexpected = |source: OperationError| OrchestratorError::UnexpectedFailure {
            step,
            label: label.to_string(),
            source,
        };

        match *expectation {
            Expectation::Succeed => {
                self.execute(operation, state).await.map_err(unexpected)?;
                Ok(StepOutcome::Passed)
            }
            Expectation::Probe => match self.execute(operation, state).await {
                Ok(()) => Ok(StepOutcome::Passed),
                Err(e) => {
                    warn!(step, "probe failed, continuing: {e}");
                    Ok(StepOutcome::ProbeFailed(e.to_string()))
                }
            },
            Expectation::Reject(expected) => {
                let guarded = match operation.guard() {
                    Some(guard) => Some((guard, self.observe(guard).await.map_err(unexpected)?)),
                    None => None,
                };

                let err = match self.execute(operation, state).await {
                    Ok(()) => {
                        return Err(OrchestratorError::ExpectationViolated {
                            step,
                            label: label.to_string(),
                            expected,
                        })
                    }
                    Err(OperationError::Chain(err)) => err,
                    Err(source) => {
                        return Err(OrchestratorError::WrongFailure {
                            step,
                            label: label.to_string(),
                            expected,
                            source,
                        })
                    }
                };
                let err = check_rejection(step, label, expected, err)?;

                if let Some((guard, before)) = guarded {
                    let after = self.observe(guard).await.map_err(unexpected)?;
                    ensure_eq(&guard.to_string(), before, after).map_err(unexpected)?;
                }

                Ok(StepOutcome::ExpectedFailure(err))
            }
        }
    }

    /// Execute an operation and its post-checks
    async fn execute(&self, operation: &Operation, state: &mut RunState) -> Result<(), OperationError> {
        match *operation {
            Operation::ResolveIdentities => {
                let deployer = self.system.address_of(Identity::Deployer);
                let new_owner = self.system.address_of(Identity::NewOwner);
                info!(%deployer, %new_owner, recipient = %self.recipient(), "resolved identities");

                let (proxy, version) = self.bind_token().await?;
                info!(proxy = %proxy.address, "proxy delegates to {version}");
            }
            Operation::ProbeImplementation(version) => {
                let address = self.contracts.implementation(version);
                let implementation = ContractHandle::token(address, version);
                let name = self.system.name(implementation).await?;
                let symbol = self.system.symbol(implementation).await?;
                info!(%address, "implementation {version}: {name} ({symbol})");
            }
            Operation::ReadProxy => {
                let (token, version) = self.bind_token().await?;
                let name = self.system.name(token).await?;
                let symbol = self.system.symbol(token).await?;
                let total_supply = self.system.total_supply(token).await?;
                let owner = self.system.owner(token).await?;
                let some_value = self.system.some_value(token).await?;
                info!(%owner, %total_supply, %some_value, "{name} ({symbol}) via proxy as {version}");

                if version == ImplementationVersion::V2 {
                    let new_value = self.system.new_value(token).await?;
                    info!(%new_value, "V2 state via proxy");
                }
                if let Some(expected) = state.some_value {
                    ensure_eq("someValue", expected, some_value)?;
                }
            }
            Operation::SetSomeValue { caller, value } => {
                let (token, _) = self.bind_token().await?;
                let tx_hash = self.system.set_some_value(caller, token, value).await?;
                info!(%tx_hash, "someValue set to {value}");

                let actual = self.system.some_value(token).await?;
                ensure_eq("someValue", value, actual)?;
                state.some_value = Some(value);
            }
            Operation::Transfer { amount } => {
                let (token, _) = self.bind_token().await?;
                let sender = self.system.address_of(Identity::Deployer);
                let recipient = self.recipient();

                let sender_before = self.system.balance_of(token, sender).await?;
                let recipient_before = self.system.balance_of(token, recipient).await?;
                let tx_hash = self.system.transfer(Identity::Deployer, token, recipient, amount).await?;
                info!(%tx_hash, %recipient, "transferred {amount} tokens");

                let sender_after = self.system.balance_of(token, sender).await?;
                let recipient_after = self.system.balance_of(token, recipient).await?;
                info!(%sender_after, %recipient_after, "balances after transfer");
                if sender != recipient {
                    ensure_eq(
                        "sender balance",
                        sender_before.saturating_sub(amount),
                        sender_after,
                    )?;
                    ensure_eq(
                        "recipient balance",
                        recipient_before.saturating_add(amount),
                        recipient_after,
                    )?;
                }
            }
            Operation::Upgrade { caller, target } => {
                let implementation = self.contracts.implementation(target);
                let tx_hash = self
                    .system
                    .upgrade(caller, self.admin(), self.contracts.proxy, implementation)
                    .await?;
                info!(%tx_hash, %implementation, "proxy upgraded to {target}");

                let active = self.system.implementation(self.contracts.proxy).await?;
                ensure_eq("proxy implementation", implementation, active)?;
            }
            Operation::InitializeV2 { caller, path } => {
                let (token, _) = self.bind_token().await?;
                let tx_hash = match path {
                    InitPath::Direct => self.system.initialize_v2(caller, token).await?,
                    InitPath::ViaAdmin => {
                        let data = Bytes::from(IImplementationV2::initializeV2Call {}.abi_encode());
                        self.system.call_proxy(caller, self.admin(), self.contracts.proxy, data).await?
                    }
                };
                info!(%tx_hash, "V2 initialized");

                let new_value = self.system.new_value(token).await?;
                info!(%new_value, "newValue after initialization");
            }
            Operation::SetNewValue { caller, value } => {
                let (token, _) = self.bind_token().await?;
                let tx_hash = self.system.set_new_value(caller, token, value).await?;
                info!(%tx_hash, "newValue set to {value}");

                let actual = self.system.new_value(token).await?;
                ensure_eq("newValue", value, actual)?;
            }
            Operation::CheckStorageContinuity => {
                let (token, version) = self.bind_token().await?;
                let actual = self.system.some_value(token).await?;
                match state.some_value {
                    Some(expected) => {
                        ensure_eq("someValue", expected, actual)?;
                        info!("someValue {actual} intact under {version}");
                    }
                    None => {
                        info!("no someValue written yet, recording {actual}");
                        state.some_value = Some(actual);
                    }
                }
            }
            Operation::TransferTokenOwnership { caller, to } => {
                let (token, _) = self.bind_token().await?;
                let new_owner = self.system.address_of(to);
                let current = self.system.owner(token).await?;
                info!(%current, "current token owner");

                let tx_hash = self.system.transfer_ownership(caller, token, new_owner).await?;
                info!(%tx_hash, "token ownership transferred to {to}");

                let actual = self.system.owner(token).await?;
                ensure_eq("token owner", new_owner, actual)?;
            }
            Operation::TransferAdminOwnership { caller, to } => {
                let admin = self.admin();
                let new_owner = self.system.address_of(to);
                let current = self.system.admin_owner(admin).await?;
                info!(%current, "current proxy admin owner");

                let tx_hash = self.system.transfer_admin_ownership(caller, admin, new_owner).await?;
                info!(%tx_hash, "proxy admin ownership transferred to {to}");

                let actual = self.system.admin_owner(admin).await?;
                ensure_eq("proxy admin owner", new_owner, actual)?;
            }
        }

        Ok(())
    }

    /// Read the state guarded through an expected rejection
    async fn observe(&self, guard: Guard) -> Result<String, OperationError> {
        let value = match guard {
            Guard::SomeValue => self.system.some_value(self.bind_token().await?.0).await?.to_string(),
            Guard::NewValue => self.system.new_value(self.bind_token().await?.0).await?.to_string(),
            Guard::Implementation => {
                self.system.implementation(self.contracts.proxy).await?.to_string()
            }
            Guard::TokenOwner => self.system.owner(self.bind_token().await?.0).await?.to_string(),
            Guard::AdminOwner => self.system.admin_owner(self.admin()).await?.to_string(),
        };

        Ok(value)
    }

    /// Bind the proxy to the interface of the implementation it currently delegates to
    async fn bind_token(&self) -> Result<(ContractHandle, ImplementationVersion), OperationError> {
        let implementation = self.system.implementation(self.contracts.proxy).await?;
        let version =
            self.contracts.version_of(implementation).ok_or_else(|| OperationError::Mismatch {
                what: "proxy implementation".to_string(),
                expected: format!(
                    "{} or {}",
                    self.contracts.implementation_v1, self.contracts.implementation_v2
                ),
                actual: implementation.to_string(),
            })?;

        Ok((ContractHandle::token(self.contracts.proxy, version), version))
    }

    /// A handle on the proxy admin
    fn admin(&self) -> ContractHandle {
        ContractHandle::proxy_admin(self.contracts.proxy_admin)
    }

    /// The recipient of token transfers
    fn recipient(&self) -> Address {
        self.recipient.unwrap_or_else(|| self.system.address_of(Identity::NewOwner))
    }
}

/// Accept a rejection if it matches the expected kind, or carries no reason at all
fn check_rejection(
    step: usize,
    label: &str,
    expected: RejectionKind,
    err: ChainError,
) -> Result<ChainError, OrchestratorError> {
    match err.rejection_kind() {
        Some(kind) if kind == expected => {
            info!(step, "rejected as expected: {err}");
            Ok(err)
        }
        None if matches!(err, ChainError::Reverted { reason: None, .. }) => {
            warn!(step, "rejected without a reason, accepting as {expected}: {err}");
            Ok(err)
        }
        _ => Err(OrchestratorError::WrongFailure {
            step,
            label: label.to_string(),
            expected,
            source: OperationError::Chain(err),
        }),
    }
}

/// Require a value read back to match the expected one
fn ensure_eq<T: PartialEq + Display>(what: &str, expected: T, actual: T) -> Result<(), OperationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(OperationError::Mismatch {
            what: what.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;
    use proxy_scripts::types::ImplementationVersion::{V1, V2};

    use crate::{
        errors::{ChainError, OperationError, OrchestratorError, RejectionKind},
        mock::{active_version, init_test_tracing, MockProxySystem},
        scenarios::{ScenarioKind, ScenarioParams},
        steps::{InitPath, Operation, Step},
        system::Identity::{Deployer, NewOwner},
    };

    use super::{RunReport, StepOutcome, UpgradeOrchestrator};

    /// Run the given steps against the mock
    async fn run(mock: &MockProxySystem, steps: &[Step]) -> Result<RunReport, OrchestratorError> {
        init_test_tracing();
        UpgradeOrchestrator::new(mock, mock.contracts(), None).run(steps).await
    }

    /// Run a scenario with default parameters against the mock
    async fn run_scenario(
        mock: &MockProxySystem,
        kind: ScenarioKind,
    ) -> Result<RunReport, OrchestratorError> {
        run(mock, &kind.steps(&ScenarioParams::default())).await
    }

    fn count(report: &RunReport, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        report.records.iter().filter(|r| pred(&r.outcome)).count()
    }

    #[tokio::test]
    async fn test_full_scenario() {
        let mock = MockProxySystem::new();
        let report = run_scenario(&mock, ScenarioKind::FullOwnershipTransferAndRollback)
            .await
            .unwrap();

        let steps = ScenarioKind::FullOwnershipTransferAndRollback.steps(&ScenarioParams::default());
        assert_eq!(report.records.len(), steps.len());
        assert_eq!(count(&report, |o| matches!(o, StepOutcome::ExpectedFailure(_))), 4);

        let state = mock.snapshot();
        assert_eq!(active_version(&state), Some(V1));
        assert_eq!(state.some_value, U256::from(123));
        assert_eq!(state.new_value, U256::from(999));
        assert!(state.v2_initialized);
        assert_eq!(state.owner, state.deployer);
        assert_eq!(state.admin_owner, state.deployer);
    }

    #[tokio::test]
    async fn test_basic_scenario_balances() {
        let mock = MockProxySystem::new();
        run_scenario(&mock, ScenarioKind::BasicUpgrade).await.unwrap();

        let state = mock.snapshot();
        assert_eq!(state.balances[&state.deployer], U256::from(950));
        assert_eq!(state.balances[&state.new_owner], U256::from(50));
        assert_eq!(state.total_supply, U256::from(1000));
        assert_eq!(active_version(&state), Some(V2));
        assert_eq!(state.some_value, U256::from(123));
        assert_eq!(state.new_value, U256::from(999));
    }

    #[tokio::test]
    async fn test_probe_failures_are_swallowed() {
        let mock = MockProxySystem::new();
        let report = run_scenario(&mock, ScenarioKind::BasicUpgrade).await.unwrap();

        // The mock's implementations revert when called directly
        let probe_failures: Vec<_> = report
            .records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::ProbeFailed(_)))
            .map(|r| r.index)
            .collect();
        assert_eq!(probe_failures, vec![2, 3]);
        assert_eq!(report.summary(), "12 steps: 10 passed, 2 probe failures");
    }

    #[tokio::test]
    async fn test_missing_rejection_aborts() {
        let mock = MockProxySystem::new();
        let steps = [
            Step::reject(Operation::Upgrade { caller: Deployer, target: V2 }, RejectionKind::Unauthorized),
            Step::succeed(Operation::ReadProxy),
        ];

        let err = run(&mock, &steps).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ExpectationViolated { step: 1, .. }));
        assert!(!mock.calls().contains(&"name"));
    }

    #[tokio::test]
    async fn test_wrong_rejection_kind() {
        let mock = MockProxySystem::new();
        let steps = [Step::reject(
            Operation::Upgrade { caller: NewOwner, target: V2 },
            RejectionKind::AlreadyInitialized,
        )];

        let err = run(&mock, &steps).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::WrongFailure { step: 1, .. }));
    }

    #[tokio::test]
    async fn test_unauthorized_upgrade_leaves_implementation() {
        let mock = MockProxySystem::new();
        let steps = [Step::reject(
            Operation::Upgrade { caller: NewOwner, target: V2 },
            RejectionKind::Unauthorized,
        )];

        let report = run(&mock, &steps).await.unwrap();
        assert!(matches!(
            report.records[0].outcome,
            StepOutcome::ExpectedFailure(ChainError::Unauthorized(_))
        ));
        assert_eq!(active_version(&mock.snapshot()), Some(V1));
    }

    #[tokio::test]
    async fn test_old_admin_rejected_after_transfer() {
        let mock = MockProxySystem::new();
        let steps = [
            Step::succeed(Operation::TransferAdminOwnership { caller: Deployer, to: NewOwner }),
            Step::reject(Operation::Upgrade { caller: Deployer, target: V2 }, RejectionKind::Unauthorized),
            Step::succeed(Operation::Upgrade { caller: NewOwner, target: V2 }),
        ];

        run(&mock, &steps).await.unwrap();
        let state = mock.snapshot();
        assert_eq!(state.admin_owner, state.new_owner);
        assert_eq!(active_version(&state), Some(V2));
    }

    #[tokio::test]
    async fn test_double_initialization_rejected() {
        let mock = MockProxySystem::new();
        let steps = [
            Step::succeed(Operation::Upgrade { caller: Deployer, target: V2 }),
            Step::succeed(Operation::InitializeV2 { caller: Deployer, path: InitPath::Direct }),
            Step::succeed(Operation::SetNewValue { caller: Deployer, value: U256::from(5) }),
            Step::reject(
                Operation::InitializeV2 { caller: Deployer, path: InitPath::Direct },
                RejectionKind::AlreadyInitialized,
            ),
        ];

        run(&mock, &steps).await.unwrap();
        assert_eq!(mock.snapshot().new_value, U256::from(5));
    }

    #[tokio::test]
    async fn test_init_paths_equivalent() {
        let mut finals = Vec::new();
        for path in [InitPath::Direct, InitPath::ViaAdmin] {
            let mock = MockProxySystem::new();
            let params = ScenarioParams { init_path: Some(path), ..Default::default() };
            run(&mock, &ScenarioKind::BasicUpgrade.steps(&params)).await.unwrap();

            let state = mock.snapshot();
            finals.push((state.v2_initialized, state.new_value, state.some_value, state.active));
        }

        assert_eq!(finals[0], finals[1]);
    }

    #[tokio::test]
    async fn test_transport_fault_aborts() {
        let mock = MockProxySystem::new();
        mock.inject_fault("upgrade", ChainError::Rpc("connection refused".to_string()));

        let err = run_scenario(&mock, ScenarioKind::BasicUpgrade).await.unwrap_err();
        assert_eq!(err.step(), 7);
        assert!(matches!(
            err,
            OrchestratorError::UnexpectedFailure {
                source: OperationError::Chain(ChainError::Rpc(_)),
                ..
            }
        ));

        // Nothing after the failing step ran
        let calls = mock.calls();
        assert!(!calls.contains(&"initialize_v2"));
        assert!(!calls.contains(&"set_new_value"));
    }

    #[tokio::test]
    async fn test_timeout_aborts() {
        let mock = MockProxySystem::new();
        mock.inject_fault("set_new_value", ChainError::Timeout("not confirmed".to_string()));

        let err = run_scenario(&mock, ScenarioKind::BasicUpgrade).await.unwrap_err();
        assert_eq!(err.step(), 10);
        assert!(matches!(
            err,
            OrchestratorError::UnexpectedFailure {
                source: OperationError::Chain(ChainError::Timeout(_)),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_lost_storage_detected() {
        let mock = MockProxySystem::new();
        mock.clobber_storage_on_upgrade();

        let err = run_scenario(&mock, ScenarioKind::BasicUpgrade).await.unwrap_err();
        assert_eq!(err.step(), 8);
        assert!(matches!(
            err,
            OrchestratorError::UnexpectedFailure { source: OperationError::Mismatch { .. }, .. }
        ));
    }

    #[tokio::test]
    async fn test_reasonless_rejection_accepted() {
        let mock = MockProxySystem::new();
        let steps = [Step::reject(
            Operation::Transfer { amount: U256::from(1) },
            RejectionKind::Unauthorized,
        )];
        mock.inject_fault(
            "transfer",
            ChainError::Reverted { message: "execution reverted".to_string(), reason: None },
        );
        let report = run(&mock, &steps).await.unwrap();
        assert!(matches!(report.records[0].outcome, StepOutcome::ExpectedFailure(_)));
    }
}
