//! The remote-ledger capability this crate consumes.
//!
//! Nothing here talks to the network. A JSON-RPC client (or a test fake)
//! implements [`LedgerClient`] and is passed explicitly into every builder and
//! workflow operation.
//!
//! All methods are blocking. Timeouts and retry policy belong to the
//! implementation; callers of this crate never retry on their own.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a [`LedgerClient`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Ledger-side validation failure: nonce too low, gas too low,
    /// insufficient balance, reverted execution.
    #[error("{0}")]
    Rejected(String),
}

/// Block selector for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockRef {
    #[default]
    Latest,
    Pending,
    Earliest,
    Number(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    /// Unix seconds.
    pub timestamp: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
}

/// Confirmation record for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// `true` when execution succeeded, `false` when it reverted.
    pub status: bool,
    pub gas_used: u64,
    /// Set only for contract-creation transactions.
    pub contract_address: Option<Address>,
}

/// Remote queries and submission against a ledger node.
pub trait LedgerClient {
    /// Next nonce for `address`, counting transactions still in the mempool.
    fn pending_nonce(&self, address: Address) -> Result<u64, LedgerError>;

    /// Current gas price suggestion, in wei.
    fn suggested_gas_price(&self) -> Result<u128, LedgerError>;

    /// Balance in wei at the given block.
    fn balance_at(&self, address: Address, block: BlockRef) -> Result<U256, LedgerError>;

    fn header_by_number(&self, block: BlockRef) -> Result<BlockHeader, LedgerError>;

    /// Number of transactions included in the block with this hash.
    fn transaction_count(&self, block_hash: B256) -> Result<u64, LedgerError>;

    /// Broadcasts a signed raw transaction, returning its hash.
    fn submit_raw_transaction(&self, raw: &[u8]) -> Result<B256, LedgerError>;

    /// Executes a call against current state without creating a transaction.
    fn simulate_call(&self, to: Address, payload: &[u8]) -> Result<Vec<u8>, LedgerError>;

    /// `Ok(None)` while the transaction is still pending.
    fn receipt_for(&self, hash: B256) -> Result<Option<Receipt>, LedgerError>;
}

impl<L: LedgerClient + ?Sized> LedgerClient for &L {
    fn pending_nonce(&self, address: Address) -> Result<u64, LedgerError> {
        (**self).pending_nonce(address)
    }

    fn suggested_gas_price(&self) -> Result<u128, LedgerError> {
        (**self).suggested_gas_price()
    }

    fn balance_at(&self, address: Address, block: BlockRef) -> Result<U256, LedgerError> {
        (**self).balance_at(address, block)
    }

    fn header_by_number(&self, block: BlockRef) -> Result<BlockHeader, LedgerError> {
        (**self).header_by_number(block)
    }

    fn transaction_count(&self, block_hash: B256) -> Result<u64, LedgerError> {
        (**self).transaction_count(block_hash)
    }

    fn submit_raw_transaction(&self, raw: &[u8]) -> Result<B256, LedgerError> {
        (**self).submit_raw_transaction(raw)
    }

    fn simulate_call(&self, to: Address, payload: &[u8]) -> Result<Vec<u8>, LedgerError> {
        (**self).simulate_call(to, payload)
    }

    fn receipt_for(&self, hash: B256) -> Result<Option<Receipt>, LedgerError> {
        (**self).receipt_for(hash)
    }
}
