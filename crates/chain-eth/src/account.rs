use alloy_primitives::{Address, U256};

use crate::error::EthError;
use crate::ledger::{BlockRef, LedgerClient};

/// Snapshot of an externally owned account as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    /// Balance in wei at the queried block.
    pub balance: U256,
    /// Next pending nonce.
    pub nonce: u64,
}

impl Account {
    /// Queries balance at `block`, then the pending nonce.
    ///
    /// An address the ledger has never seen reports a zero balance and nonce.
    pub fn observe<L: LedgerClient + ?Sized>(
        address: Address,
        block: BlockRef,
        ledger: &L,
    ) -> Result<Self, EthError> {
        let balance = ledger.balance_at(address, block)?;
        let nonce = ledger.pending_nonce(address)?;
        tracing::debug!(%address, %balance, nonce, "observed account");
        Ok(Self {
            address,
            balance,
            nonce,
        })
    }

    pub fn is_fresh(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero()
    }
}
