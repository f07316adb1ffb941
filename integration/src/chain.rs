//! The proxy system backed by a node, reached over JSON-RPC through alloy

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    providers::DynProvider,
};
use proxy_scripts::{
    solidity::{IImplementationV1, IImplementationV2, IProxyAdmin},
    types::ImplementationVersion,
    utils::{connect_signer, parse_signer, read_implementation},
};
use tokio::time::timeout;
use tracing::debug;

use crate::{
    config::OrchestratorConfig,
    errors::{classify_revert, ChainError},
    system::{ContractHandle, Identity, Interface, ProxySystem},
};

/// Await a view call, returning its single output
macro_rules! read {
    ($call:expr) => {
        $call.call().await.map_err(|e| classify_contract_error(&e))?._0
    };
}

/// Send a transaction and wait, within the confirmation timeout, for it to
/// be mined successfully
macro_rules! submit {
    ($self:ident, $what:literal, $call:expr) => {{
        let pending = $call.send().await.map_err(|e| classify_contract_error(&e))?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, "submitted {}", $what);

        let receipt = timeout($self.confirmation_timeout, pending.get_receipt())
            .await
            .map_err(|_| {
                ChainError::Timeout(format!(
                    "{} tx {tx_hash} not confirmed within {:?}",
                    $what, $self.confirmation_timeout
                ))
            })?
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::Reverted {
                message: format!("{} tx {tx_hash} reverted", $what),
                reason: None,
            });
        }

        Ok(tx_hash)
    }};
}

/// Bind a token handle to the ABI of its interface and evaluate `$body` with it
macro_rules! with_token {
    ($token:expr, $client:expr, |$contract:ident| $body:expr) => {
        match $token.interface {
            Interface::Token(ImplementationVersion::V2) => {
                let $contract = IImplementationV2::new($token.address, $client);
                $body
            }
            _ => {
                let $contract = IImplementationV1::new($token.address, $client);
                $body
            }
        }
    };
}

/// A signer connected to the node
struct Account {
    /// The signer's address
    address: Address,
    /// A client signing with the account's key
    client: DynProvider,
}

impl Account {
    /// Derive the account from its key and connect it
    async fn connect(priv_key: &str, rpc_url: &str) -> Result<Self, ChainError> {
        let signer = parse_signer(priv_key).map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let address = signer.address();
        let client =
            connect_signer(signer, rpc_url).await.map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(Self { address, client })
    }
}

/// A proxy system on a live node, with one signing client per identity
pub struct AlloyBackend {
    /// The deployer account
    deployer: Account,
    /// The new owner account
    new_owner: Account,
    /// Bound on waiting for each transaction to be confirmed
    confirmation_timeout: Duration,
}

impl AlloyBackend {
    /// Derive both identities and connect them to the node
    pub async fn connect(config: &OrchestratorConfig) -> Result<Self, ChainError> {
        let deployer = Account::connect(&config.deployer_key, &config.rpc_url).await?;
        let new_owner = Account::connect(&config.new_owner_key, &config.rpc_url).await?;

        Ok(Self { deployer, new_owner, confirmation_timeout: config.confirmation_timeout })
    }

    fn account(&self, identity: Identity) -> &Account {
        match identity {
            Identity::Deployer => &self.deployer,
            Identity::NewOwner => &self.new_owner,
        }
    }

    /// A client signing as the given identity
    fn client(&self, identity: Identity) -> DynProvider {
        self.account(identity).client.clone()
    }

    /// A client for view calls
    fn reader(&self) -> DynProvider {
        self.deployer.client.clone()
    }
}

/// Map a contract call error onto the chain error taxonomy.
///
/// Only errors the node reports as reverts are classified as rejections,
/// everything else is a connectivity failure.
fn classify_contract_error(err: &alloy_contract::Error) -> ChainError {
    if let alloy_contract::Error::TransportError(rpc_err) = err {
        if let Some(payload) = rpc_err.as_error_resp() {
            let data = payload.as_revert_data();
            if data.is_some() || payload.message.contains("revert") {
                return classify_revert(&payload.message, data.as_ref().map(|d| &d[..]));
            }
        }
    }

    ChainError::Rpc(err.to_string())
}

impl ProxySystem for AlloyBackend {
    fn address_of(&self, identity: Identity) -> Address {
        self.account(identity).address
    }

    async fn implementation(&self, proxy: Address) -> Result<Address, ChainError> {
        read_implementation(&self.deployer.client, proxy)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn name(&self, token: ContractHandle) -> Result<String, ChainError> {
        Ok(with_token!(token, self.reader(), |contract| read!(contract.name())))
    }

    async fn symbol(&self, token: ContractHandle) -> Result<String, ChainError> {
        Ok(with_token!(token, self.reader(), |contract| read!(contract.symbol())))
    }

    async fn total_supply(&self, token: ContractHandle) -> Result<U256, ChainError> {
        Ok(with_token!(token, self.reader(), |contract| read!(contract.totalSupply())))
    }

    async fn balance_of(&self, token: ContractHandle, account: Address) -> Result<U256, ChainError> {
        Ok(with_token!(token, self.reader(), |contract| read!(contract.balanceOf(account))))
    }

    async fn owner(&self, token: ContractHandle) -> Result<Address, ChainError> {
        Ok(with_token!(token, self.reader(), |contract| read!(contract.owner())))
    }

    async fn some_value(&self, token: ContractHandle) -> Result<U256, ChainError> {
        Ok(with_token!(token, self.reader(), |contract| read!(contract.getSomeValue())))
    }

    async fn new_value(&self, token: ContractHandle) -> Result<U256, ChainError> {
        let contract = IImplementationV2::new(token.address, self.reader());
        Ok(read!(contract.getNewValue()))
    }

    async fn set_some_value(
        &self,
        caller: Identity,
        token: ContractHandle,
        value: U256,
    ) -> Result<TxHash, ChainError> {
        with_token!(token, self.client(caller), |contract| {
            submit!(self, "setSomeValue", contract.setSomeValue(value))
        })
    }

    async fn transfer(
        &self,
        caller: Identity,
        token: ContractHandle,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ChainError> {
        with_token!(token, self.client(caller), |contract| {
            submit!(self, "transfer", contract.transfer(to, amount))
        })
    }

    async fn transfer_ownership(
        &self,
        caller: Identity,
        token: ContractHandle,
        new_owner: Address,
    ) -> Result<TxHash, ChainError> {
        with_token!(token, self.client(caller), |contract| {
            submit!(self, "transferOwnership", contract.transferOwnership(new_owner))
        })
    }

    async fn initialize_v2(
        &self,
        caller: Identity,
        token: ContractHandle,
    ) -> Result<TxHash, ChainError> {
        let contract = IImplementationV2::new(token.address, self.client(caller));
        submit!(self, "initializeV2", contract.initializeV2())
    }

    async fn set_new_value(
        &self,
        caller: Identity,
        token: ContractHandle,
        value: U256,
    ) -> Result<TxHash, ChainError> {
        let contract = IImplementationV2::new(token.address, self.client(caller));
        submit!(self, "setNewValue", contract.setNewValue(value))
    }

    async fn admin_owner(&self, admin: ContractHandle) -> Result<Address, ChainError> {
        let contract = IProxyAdmin::new(admin.address, self.reader());
        Ok(read!(contract.owner()))
    }

    async fn upgrade(
        &self,
        caller: Identity,
        admin: ContractHandle,
        proxy: Address,
        implementation: Address,
    ) -> Result<TxHash, ChainError> {
        let contract = IProxyAdmin::new(admin.address, self.client(caller));
        submit!(self, "upgrade", contract.upgrade(proxy, implementation))
    }

    async fn transfer_admin_ownership(
        &self,
        caller: Identity,
        admin: ContractHandle,
        new_owner: Address,
    ) -> Result<TxHash, ChainError> {
        let contract = IProxyAdmin::new(admin.address, self.client(caller));
        submit!(self, "transferProxyAdminOwnership", contract.transferProxyAdminOwnership(new_owner))
    }

    async fn call_proxy(
        &self,
        caller: Identity,
        admin: ContractHandle,
        proxy: Address,
        data: Bytes,
    ) -> Result<TxHash, ChainError> {
        let contract = IProxyAdmin::new(admin.address, self.client(caller));
        submit!(self, "callProxy", contract.callProxy(proxy, data))
    }
}
