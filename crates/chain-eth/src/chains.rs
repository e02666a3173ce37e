/// Gas limit for a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas limit for contract calls and deployments when the caller sets none.
pub const CONTRACT_GAS_LIMIT: u64 = 300_000;

/// Chain ID of a local development node (geth --dev, ganache, anvil).
pub const LOCAL_DEV_CHAIN_ID: u64 = 1337;

/// Largest chain ID whose EIP-155 `v` (`chain_id * 2 + 36` at most) fits in a `u64`.
pub const MAX_CHAIN_ID: u64 = (u64::MAX - 36) / 2;
