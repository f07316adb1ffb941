//! Constants used by the upgrade orchestrator

/// The default bound on waiting for a single transaction to be confirmed, in seconds
pub(crate) const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// The default value written to `someValue` before upgrading
pub(crate) const DEFAULT_SOME_VALUE: u64 = 123;

/// The default value written to `newValue` once the proxy runs V2
pub(crate) const DEFAULT_NEW_VALUE: u64 = 999;

/// The default amount of tokens transferred from the deployer to the recipient
pub(crate) const DEFAULT_TRANSFER_AMOUNT: u64 = 50;

/// The value the previous owner attempts to write after losing ownership
pub(crate) const DEFAULT_INTRUDER_VALUE: u64 = 777;

/// Revert reason used by legacy `Ownable` contracts
pub(crate) const LEGACY_UNAUTHORIZED_REASON: &str = "caller is not the owner";

/// Revert reason used by legacy `Initializable` contracts
pub(crate) const LEGACY_ALREADY_INITIALIZED_REASON: &str = "already initialized";

/// Prefix nodes put in front of a decoded revert reason
pub(crate) const EXECUTION_REVERTED_PREFIX: &str = "execution reverted:";
