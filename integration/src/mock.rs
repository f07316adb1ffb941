//! An in-memory proxy system for testing the orchestrator

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, Once},
};

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use proxy_scripts::{solidity::IImplementationV2, types::ImplementationVersion};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    errors::ChainError,
    system::{ContractHandle, ContractSet, Identity, ProxySystem},
};

static TRACING_INIT: Once = Once::new();

/// Set up logging for tests, once per process
pub fn init_test_tracing() {
    TRACING_INIT.call_once(|| {
        fmt().with_env_filter(EnvFilter::from_default_env()).with_test_writer().init();
    });
}

/// The supply minted to the deployer on initialization
pub const INITIAL_SUPPLY: u64 = 1000;

/// The contract state held by the mock
#[derive(Debug, Clone)]
pub struct MockState {
    pub contracts: ContractSet,
    pub deployer: Address,
    pub new_owner: Address,
    pub admin_owner: Address,
    pub active: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: U256,
    pub balances: HashMap<Address, U256>,
    pub owner: Address,
    pub some_value: U256,
    pub new_value: U256,
    pub v2_initialized: bool,
    nonce: u64,
}

/// An in-memory proxy, admin and pair of implementations.
///
/// The proxy holds the token storage and dispatches by the active
/// implementation; calling a V2-only function while V1 is active reverts
/// without a reason, as does reading from an implementation directly.
pub struct MockProxySystem {
    state: Mutex<MockState>,
    /// Failures returned by the next call to the named method
    faults: Mutex<HashMap<&'static str, ChainError>>,
    /// The methods called, in order
    calls: Mutex<Vec<&'static str>>,
    /// Whether upgrading wipes the proxy's storage
    clobber_on_upgrade: Mutex<bool>,
}

impl MockProxySystem {
    /// A freshly deployed and initialized system
    pub fn new() -> Self {
        let deployer = Address::repeat_byte(0x01);
        let contracts = ContractSet {
            proxy_admin: Address::repeat_byte(0xaa),
            implementation_v1: Address::repeat_byte(0x11),
            implementation_v2: Address::repeat_byte(0x22),
            proxy: Address::repeat_byte(0x99),
        };

        let state = MockState {
            contracts,
            deployer,
            new_owner: Address::repeat_byte(0x02),
            admin_owner: deployer,
            active: contracts.implementation_v1,
            name: "Upgradeable Token".to_string(),
            symbol: "UPT".to_string(),
            total_supply: U256::from(INITIAL_SUPPLY),
            balances: HashMap::from([(deployer, U256::from(INITIAL_SUPPLY))]),
            owner: deployer,
            some_value: U256::ZERO,
            new_value: U256::ZERO,
            v2_initialized: false,
            nonce: 0,
        };

        Self {
            state: Mutex::new(state),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            clobber_on_upgrade: Mutex::new(false),
        }
    }

    /// The deployed contract addresses
    pub fn contracts(&self) -> ContractSet {
        self.lock().contracts
    }

    /// A snapshot of the contract state
    pub fn snapshot(&self) -> MockState {
        self.lock().clone()
    }

    /// The methods called so far
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Fail the next call to `method` with `error`
    pub fn inject_fault(&self, method: &'static str, error: ChainError) {
        self.faults.lock().unwrap().insert(method, error);
    }

    /// Make upgrades reset the proxy's storage, breaking continuity
    pub fn clobber_storage_on_upgrade(&self) {
        *self.clobber_on_upgrade.lock().unwrap() = true;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Record a call and return any fault injected for it
    fn enter(&self, method: &'static str) -> Result<(), ChainError> {
        self.calls.lock().unwrap().push(method);
        match self.faults.lock().unwrap().remove(method) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Lock the state for a call on the proxy, rejecting direct implementation calls
    fn proxy_state(&self, method: &'static str, token: ContractHandle) -> Result<MutexGuard<'_, MockState>, ChainError> {
        self.enter(method)?;
        let state = self.lock();
        if token.address != state.contracts.proxy {
            return Err(reasonless_revert());
        }

        Ok(state)
    }

    /// Lock the state for a V2-only call on the proxy
    fn v2_state(&self, method: &'static str, token: ContractHandle) -> Result<MutexGuard<'_, MockState>, ChainError> {
        let state = self.proxy_state(method, token)?;
        if state.active != state.contracts.implementation_v2 {
            return Err(reasonless_revert());
        }

        Ok(state)
    }

    /// Lock the state for a call on the proxy admin
    fn admin_state(&self, method: &'static str, admin: ContractHandle) -> Result<MutexGuard<'_, MockState>, ChainError> {
        self.enter(method)?;
        let state = self.lock();
        if admin.address != state.contracts.proxy_admin {
            return Err(reasonless_revert());
        }

        Ok(state)
    }
}

impl MockState {
    fn address_of(&self, identity: Identity) -> Address {
        match identity {
            Identity::Deployer => self.deployer,
            Identity::NewOwner => self.new_owner,
        }
    }

    fn next_tx(&mut self) -> TxHash {
        self.nonce += 1;
        TxHash::left_padding_from(&self.nonce.to_be_bytes())
    }

    fn only_owner(&self, caller: Identity) -> Result<(), ChainError> {
        let caller = self.address_of(caller);
        if caller == self.owner {
            Ok(())
        } else {
            Err(ChainError::Unauthorized(format!("OwnableUnauthorizedAccount({caller})")))
        }
    }

    fn only_admin_owner(&self, caller: Identity) -> Result<(), ChainError> {
        let caller = self.address_of(caller);
        if caller == self.admin_owner {
            Ok(())
        } else {
            Err(ChainError::Unauthorized(format!("OwnableUnauthorizedAccount({caller})")))
        }
    }

    fn initialize_v2(&mut self) -> Result<TxHash, ChainError> {
        if self.active != self.contracts.implementation_v2 {
            return Err(reasonless_revert());
        }
        if self.v2_initialized {
            return Err(ChainError::AlreadyInitialized("InvalidInitialization()".to_string()));
        }

        self.v2_initialized = true;
        Ok(self.next_tx())
    }
}

fn reasonless_revert() -> ChainError {
    ChainError::Reverted { message: "execution reverted".to_string(), reason: None }
}

impl ProxySystem for MockProxySystem {
    fn address_of(&self, identity: Identity) -> Address {
        self.lock().address_of(identity)
    }

    async fn implementation(&self, proxy: Address) -> Result<Address, ChainError> {
        self.enter("implementation")?;
        let state = self.lock();
        if proxy != state.contracts.proxy {
            return Ok(Address::ZERO);
        }

        Ok(state.active)
    }

    async fn name(&self, token: ContractHandle) -> Result<String, ChainError> {
        Ok(self.proxy_state("name", token)?.name.clone())
    }

    async fn symbol(&self, token: ContractHandle) -> Result<String, ChainError> {
        Ok(self.proxy_state("symbol", token)?.symbol.clone())
    }

    async fn total_supply(&self, token: ContractHandle) -> Result<U256, ChainError> {
        Ok(self.proxy_state("total_supply", token)?.total_supply)
    }

    async fn balance_of(&self, token: ContractHandle, account: Address) -> Result<U256, ChainError> {
        let state = self.proxy_state("balance_of", token)?;
        Ok(state.balances.get(&account).copied().unwrap_or_default())
    }

    async fn owner(&self, token: ContractHandle) -> Result<Address, ChainError> {
        Ok(self.proxy_state("owner", token)?.owner)
    }

    async fn some_value(&self, token: ContractHandle) -> Result<U256, ChainError> {
        Ok(self.proxy_state("some_value", token)?.some_value)
    }

    async fn new_value(&self, token: ContractHandle) -> Result<U256, ChainError> {
        Ok(self.v2_state("new_value", token)?.new_value)
    }

    async fn set_some_value(
        &self,
        caller: Identity,
        token: ContractHandle,
        value: U256,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.proxy_state("set_some_value", token)?;
        state.only_owner(caller)?;
        state.some_value = value;
        Ok(state.next_tx())
    }

    async fn transfer(
        &self,
        caller: Identity,
        token: ContractHandle,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.proxy_state("transfer", token)?;
        let from = state.address_of(caller);
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return Err(ChainError::Reverted {
                message: "execution reverted: ERC20: transfer amount exceeds balance".to_string(),
                reason: Some("ERC20: transfer amount exceeds balance".to_string()),
            });
        }

        state.balances.insert(from, balance - amount);
        *state.balances.entry(to).or_default() += amount;
        Ok(state.next_tx())
    }

    async fn transfer_ownership(
        &self,
        caller: Identity,
        token: ContractHandle,
        new_owner: Address,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.proxy_state("transfer_ownership", token)?;
        state.only_owner(caller)?;
        state.owner = new_owner;
        Ok(state.next_tx())
    }

    async fn initialize_v2(
        &self,
        _caller: Identity,
        token: ContractHandle,
    ) -> Result<TxHash, ChainError> {
        self.proxy_state("initialize_v2", token)?.initialize_v2()
    }

    async fn set_new_value(
        &self,
        caller: Identity,
        token: ContractHandle,
        value: U256,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.v2_state("set_new_value", token)?;
        state.only_owner(caller)?;
        state.new_value = value;
        Ok(state.next_tx())
    }

    async fn admin_owner(&self, admin: ContractHandle) -> Result<Address, ChainError> {
        Ok(self.admin_state("admin_owner", admin)?.admin_owner)
    }

    async fn upgrade(
        &self,
        caller: Identity,
        admin: ContractHandle,
        proxy: Address,
        implementation: Address,
    ) -> Result<TxHash, ChainError> {
        let clobber = *self.clobber_on_upgrade.lock().unwrap();
        let mut state = self.admin_state("upgrade", admin)?;
        state.only_admin_owner(caller)?;
        if proxy != state.contracts.proxy {
            return Err(reasonless_revert());
        }

        state.active = implementation;
        if clobber {
            state.some_value = U256::ZERO;
        }
        Ok(state.next_tx())
    }

    async fn transfer_admin_ownership(
        &self,
        caller: Identity,
        admin: ContractHandle,
        new_owner: Address,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.admin_state("transfer_admin_ownership", admin)?;
        state.only_admin_owner(caller)?;
        state.admin_owner = new_owner;
        Ok(state.next_tx())
    }

    async fn call_proxy(
        &self,
        caller: Identity,
        admin: ContractHandle,
        proxy: Address,
        data: Bytes,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.admin_state("call_proxy", admin)?;
        state.only_admin_owner(caller)?;
        if proxy != state.contracts.proxy
            || !data.starts_with(&IImplementationV2::initializeV2Call::SELECTOR)
        {
            return Err(reasonless_revert());
        }

        state.initialize_v2()
    }
}

/// The version a snapshot's proxy is running
pub fn active_version(state: &MockState) -> Option<ImplementationVersion> {
    state.contracts.version_of(state.active)
}
