//! The seam between the orchestrator and the remote contract system

use std::fmt::{self, Display};

use alloy::primitives::{Address, Bytes, TxHash, U256};
use proxy_scripts::types::ImplementationVersion;

use crate::errors::ChainError;

/// The accounts the orchestrator signs transactions with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// The account that deployed the system and initially owns everything
    Deployer,
    /// The account ownership is handed over to
    NewOwner,
}

impl Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Deployer => write!(f, "deployer"),
            Identity::NewOwner => write!(f, "new owner"),
        }
    }
}

/// The ABI a contract handle is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// The proxy admin
    ProxyAdmin,
    /// A token implementation, either reached directly or through the proxy
    Token(ImplementationVersion),
}

/// An address paired with the interface calls to it are encoded against.
///
/// The interface is not checked locally: a call encoded against the wrong
/// interface fails on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractHandle {
    /// The contract address
    pub address: Address,
    /// The interface the calls are encoded against
    pub interface: Interface,
}

impl ContractHandle {
    /// A handle on the proxy admin
    pub fn proxy_admin(address: Address) -> Self {
        Self { address, interface: Interface::ProxyAdmin }
    }

    /// A handle on a token implementation
    pub fn token(address: Address, version: ImplementationVersion) -> Self {
        Self { address, interface: Interface::Token(version) }
    }
}

/// The addresses of a deployed upgradeable token system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSet {
    /// The proxy admin
    pub proxy_admin: Address,
    /// The first implementation
    pub implementation_v1: Address,
    /// The second implementation
    pub implementation_v2: Address,
    /// The proxy
    pub proxy: Address,
}

impl ContractSet {
    /// The address of the given implementation
    pub fn implementation(&self, version: ImplementationVersion) -> Address {
        match version {
            ImplementationVersion::V1 => self.implementation_v1,
            ImplementationVersion::V2 => self.implementation_v2,
        }
    }

    /// The version deployed at the given address, if it is one of ours
    pub fn version_of(&self, implementation: Address) -> Option<ImplementationVersion> {
        if implementation == self.implementation_v1 {
            Some(ImplementationVersion::V1)
        } else if implementation == self.implementation_v2 {
            Some(ImplementationVersion::V2)
        } else {
            None
        }
    }
}

/// The remote operations the orchestrator performs.
///
/// Reads return once the node answers. Writes return once the transaction is
/// confirmed, so their effects are visible to any subsequent read.
#[allow(async_fn_in_trait)]
pub trait ProxySystem {
    /// The address of an identity
    fn address_of(&self, identity: Identity) -> Address;

    /// The implementation the proxy currently delegates to
    async fn implementation(&self, proxy: Address) -> Result<Address, ChainError>;

    // --- Token reads ---

    /// `name()`
    async fn name(&self, token: ContractHandle) -> Result<String, ChainError>;
    /// `symbol()`
    async fn symbol(&self, token: ContractHandle) -> Result<String, ChainError>;
    /// `totalSupply()`
    async fn total_supply(&self, token: ContractHandle) -> Result<U256, ChainError>;
    /// `balanceOf(account)`
    async fn balance_of(&self, token: ContractHandle, account: Address)
        -> Result<U256, ChainError>;
    /// `owner()`
    async fn owner(&self, token: ContractHandle) -> Result<Address, ChainError>;
    /// `getSomeValue()`
    async fn some_value(&self, token: ContractHandle) -> Result<U256, ChainError>;
    /// `getNewValue()`, V2 only
    async fn new_value(&self, token: ContractHandle) -> Result<U256, ChainError>;

    // --- Token writes ---

    /// `setSomeValue(value)`
    async fn set_some_value(
        &self,
        caller: Identity,
        token: ContractHandle,
        value: U256,
    ) -> Result<TxHash, ChainError>;
    /// `transfer(to, amount)`
    async fn transfer(
        &self,
        caller: Identity,
        token: ContractHandle,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError>;
    /// `transferOwnership(newOwner)`
    async fn transfer_ownership(
        &self,
        caller: Identity,
        token: ContractHandle,
        new_owner: Address,
    ) -> Result<TxHash, ChainError>;
    /// `initializeV2()`, V2 only
    async fn initialize_v2(
        &self,
        caller: Identity,
        token: ContractHandle,
    ) -> Result<TxHash, ChainError>;
    /// `setNewValue(value)`, V2 only
    async fn set_new_value(
        &self,
        caller: Identity,
        token: ContractHandle,
        value: U256,
    ) -> Result<TxHash, ChainError>;

    // --- Proxy admin ---

    /// The admin's `owner()`
    async fn admin_owner(&self, admin: ContractHandle) -> Result<Address, ChainError>;
    /// `upgrade(proxy, implementation)`
    async fn upgrade(
        &self,
        caller: Identity,
        admin: ContractHandle,
        proxy: Address,
        implementation: Address,
    ) -> Result<TxHash, ChainError>;
    /// `transferProxyAdminOwnership(newOwner)`
    async fn transfer_admin_ownership(
        &self,
        caller: Identity,
        admin: ContractHandle,
        new_owner: Address,
    ) -> Result<TxHash, ChainError>;
    /// `callProxy(proxy, data)`
    async fn call_proxy(
        &self,
        caller: Identity,
        admin: ContractHandle,
        proxy: Address,
        data: Bytes,
    ) -> Result<TxHash, ChainError>;
}
