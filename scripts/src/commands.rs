//! Implementations of the proxy management scripts

use std::{
    path::Path,
    str::FromStr,
};

use alloy::providers::DynProvider;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolValue;
use tracing::{info, warn};

use crate::{
    cli::{DeployArgs, StatusArgs, TransferAdminArgs, UpgradeArgs},
    errors::ScriptError,
    solidity::{IImplementationV1, IProxyAdmin},
    types::{DeployedContract, ImplementationVersion},
    utils::{
        check_receipt, deploy_bytecode, load_artifact_bytecode, parse_addr_from_deployments_file,
        parse_address, read_implementation, read_proxy_admin, resolve_address,
        write_deployed_address,
    },
};

/// Deploy the full upgradeable token system, recording each address in the deployments file
pub async fn deploy(
    args: DeployArgs,
    client: DynProvider,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let artifacts_dir = args.artifacts_dir.as_path();

    let proxy_admin = deploy_contract(
        &client,
        artifacts_dir,
        DeployedContract::ProxyAdmin,
        Bytes::new(),
        deployments_path,
    )
    .await?;

    let implementation_v1 = deploy_contract(
        &client,
        artifacts_dir,
        DeployedContract::ImplementationV1,
        Bytes::new(),
        deployments_path,
    )
    .await?;

    // The proxy is constructed with no initialization calldata, the token is
    // initialized in a separate transaction below
    let constructor_args = (implementation_v1, proxy_admin, Bytes::new()).abi_encode_params();
    let proxy = deploy_contract(
        &client,
        artifacts_dir,
        DeployedContract::Proxy,
        constructor_args.into(),
        deployments_path,
    )
    .await?;

    let token = IImplementationV1::new(proxy, client.clone());
    let receipt = token
        .initialize(
            args.name.clone(),
            args.symbol.clone(),
            U256::from(args.initial_supply),
        )
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    check_receipt(&receipt, "initialize")?;
    info!(
        "initialized {} ({}) with supply {} via the proxy",
        args.name, args.symbol, args.initial_supply
    );

    let admin_slot = read_proxy_admin(&client, proxy).await?;
    if admin_slot != proxy_admin {
        warn!(
            "proxy admin slot holds {admin_slot:#x}, expected the deployed proxy admin {proxy_admin:#x}"
        );
    }

    if args.skip_v2 {
        info!("skipping deployment of {}", DeployedContract::ImplementationV2);
    } else {
        deploy_contract(
            &client,
            artifacts_dir,
            DeployedContract::ImplementationV2,
            Bytes::new(),
            deployments_path,
        )
        .await?;
    }

    Ok(())
}

/// Point the proxy at a new implementation, optionally forwarding calldata
/// to the proxy through the admin afterwards
pub async fn upgrade(
    args: UpgradeArgs,
    client: DynProvider,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let proxy_admin_address = resolve_address(
        args.proxy_admin.as_deref(),
        deployments_path,
        DeployedContract::ProxyAdmin,
    )?;
    let proxy_address =
        resolve_address(args.proxy.as_deref(), deployments_path, DeployedContract::Proxy)?;
    let implementation_address =
        resolve_implementation(args.implementation.as_deref(), args.version, deployments_path)?;

    let proxy_admin = IProxyAdmin::new(proxy_admin_address, client.clone());
    let receipt = proxy_admin
        .upgrade(proxy_address, implementation_address)
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    check_receipt(&receipt, "upgrade")?;

    let active = read_implementation(&client, proxy_address).await?;
    if active != implementation_address {
        return Err(ScriptError::Verification(format!(
            "proxy delegates to {active:#x} after upgrading to {implementation_address:#x}"
        )));
    }
    info!("proxy {proxy_address:#x} now delegates to {implementation_address:#x}");

    if let Some(calldata) = args.calldata {
        let data = Bytes::from_str(&calldata)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        let data_len = data.len();

        let receipt = proxy_admin
            .callProxy(proxy_address, data)
            .send()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        check_receipt(&receipt, "callProxy")?;
        info!("forwarded {data_len} bytes of calldata to the proxy");
    }

    Ok(())
}

/// Transfer ownership of the proxy admin, checking the new owner took effect
pub async fn transfer_admin(
    args: TransferAdminArgs,
    client: DynProvider,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let proxy_admin_address = resolve_address(
        args.proxy_admin.as_deref(),
        deployments_path,
        DeployedContract::ProxyAdmin,
    )?;
    let new_owner = parse_address(&args.new_owner)?;
    let proxy_admin = IProxyAdmin::new(proxy_admin_address, client);

    let current_owner = proxy_admin
        .owner()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        ._0;
    info!("current proxy admin owner: {current_owner:#x}");

    let receipt = proxy_admin
        .transferProxyAdminOwnership(new_owner)
        .send()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        .get_receipt()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    check_receipt(&receipt, "transferProxyAdminOwnership")?;

    let owner_after = proxy_admin
        .owner()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        ._0;
    if owner_after != new_owner {
        return Err(ScriptError::Verification(format!(
            "proxy admin owned by {owner_after:#x} after transferring to {new_owner:#x}"
        )));
    }
    info!("proxy admin ownership transferred to {new_owner:#x}");

    Ok(())
}

/// Print the admin, implementation and owners of a proxy
pub async fn status(
    args: StatusArgs,
    client: DynProvider,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let proxy_address =
        resolve_address(args.proxy.as_deref(), deployments_path, DeployedContract::Proxy)?;

    let admin_slot = read_proxy_admin(&client, proxy_address).await?;
    let proxy_admin_address = resolve_address(
        args.proxy_admin.as_deref(),
        deployments_path,
        DeployedContract::ProxyAdmin,
    )
    .unwrap_or(admin_slot);

    let implementation = read_implementation(&client, proxy_address).await?;
    let version = [ImplementationVersion::V1, ImplementationVersion::V2]
        .into_iter()
        .find(|v| {
            parse_addr_from_deployments_file(deployments_path, v.contract().deployments_key())
                .is_ok_and(|addr| addr == implementation)
        });

    let admin_owner = IProxyAdmin::new(proxy_admin_address, client.clone())
        .owner()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        ._0;
    let token_owner = IImplementationV1::new(proxy_address, client)
        .owner()
        .call()
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
        ._0;

    info!("proxy:              {proxy_address:#x}");
    info!("admin slot:         {admin_slot:#x}");
    match version {
        Some(version) => info!("implementation:     {implementation:#x} ({version})"),
        None => info!("implementation:     {implementation:#x}"),
    }
    info!("proxy admin owner:  {admin_owner:#x}");
    info!("token owner:        {token_owner:#x}");

    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Deploy a contract from its artifact with the given encoded constructor
/// arguments, and record its address in the deployments file
async fn deploy_contract(
    client: &DynProvider,
    artifacts_dir: &Path,
    contract: DeployedContract,
    constructor_args: Bytes,
    deployments_path: &Path,
) -> Result<Address, ScriptError> {
    let bytecode = load_artifact_bytecode(artifacts_dir, contract)?;
    let code: Bytes = [bytecode.as_ref(), constructor_args.as_ref()].concat().into();

    info!("deploying {contract}");
    let address = deploy_bytecode(client, code).await?;
    write_deployed_address(deployments_path, contract.deployments_key(), address)?;
    info!("{contract} deployed at {address:#x}");

    Ok(address)
}

/// Resolve the implementation to upgrade to, either from an explicit address
/// or from the deployments file entry of the given version
fn resolve_implementation(
    implementation: Option<&str>,
    version: Option<ImplementationVersion>,
    deployments_path: &Path,
) -> Result<Address, ScriptError> {
    match (implementation, version) {
        (Some(addr), _) => parse_address(addr),
        (None, Some(version)) => {
            parse_addr_from_deployments_file(deployments_path, version.contract().deployments_key())
        }
        (None, None) => Err(ScriptError::CalldataConstruction(
            "either an implementation address or a version is required".to_string(),
        )),
    }
}
