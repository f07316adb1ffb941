//! Definitions of the Solidity interfaces called by the scripts and the orchestrator
#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use alloy::sol;

sol! {
    /// The interface of the first token implementation behind the proxy
    #[sol(rpc)]
    interface IImplementationV1 {
        function initialize(string memory name, string memory symbol, uint256 initialSupply) external;
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;
        function getSomeValue() external view returns (uint256);
        function setSomeValue(uint256 value) external;
    }

    /// The interface of the second token implementation, a superset of the first
    #[sol(rpc)]
    interface IImplementationV2 {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;
        function getSomeValue() external view returns (uint256);
        function setSomeValue(uint256 value) external;
        function initializeV2() external;
        function getNewValue() external view returns (uint256);
        function setNewValue(uint256 value) external;
    }

    /// The admin contract holding the upgrade rights over the proxy
    #[sol(rpc)]
    interface IProxyAdmin {
        function upgrade(address proxy, address implementation) external;
        function owner() external view returns (address);
        function transferProxyAdminOwnership(address newOwner) external;
        function callProxy(address proxy, bytes memory data) external;
    }

    /// Raised by `Ownable` when the caller is not the owner
    error OwnableUnauthorizedAccount(address account);

    /// Raised by `Initializable` when an initializer runs twice
    error InvalidInitialization();
}
