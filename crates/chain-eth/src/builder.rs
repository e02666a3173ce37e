use alloy_primitives::{Address, U256};

use crate::chains::{CONTRACT_GAS_LIMIT, TRANSFER_GAS_LIMIT};
use crate::error::EthError;
use crate::ledger::LedgerClient;
use crate::transaction::UnsignedTransaction;

/// What an unsigned transaction should do once chain parameters are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxKind {
    Transfer { to: Address, value: U256 },
    Call { contract: Address, data: Vec<u8>, value: U256 },
    /// Creation bytecode with constructor arguments already appended.
    Create { bytecode: Vec<u8> },
}

impl TxKind {
    fn default_gas_limit(&self) -> u64 {
        match self {
            TxKind::Transfer { .. } => TRANSFER_GAS_LIMIT,
            TxKind::Call { .. } | TxKind::Create { .. } => CONTRACT_GAS_LIMIT,
        }
    }
}

/// Assembles unsigned transactions from intent plus fresh chain parameters.
///
/// Nonce and gas price are fetched from the ledger on every build, nonce
/// first, and never cached: the values should be as close as possible to the
/// moment of signing. Two concurrent builds for the same sender can still
/// observe the same nonce; serialising them is up to the caller.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    chain_id: u64,
    gas_limit: Option<u64>,
}

impl TransactionBuilder {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_limit: None,
        }
    }

    /// Overrides the per-kind default gas limit.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Builds a plain value transfer with an empty payload.
    pub fn build_transfer<L: LedgerClient + ?Sized>(
        &self,
        from: Address,
        to: Address,
        value: U256,
        ledger: &L,
    ) -> Result<UnsignedTransaction, EthError> {
        self.build(from, TxKind::Transfer { to, value }, ledger)
    }

    /// Builds a state-changing call to `contract` with ABI-encoded `data`.
    pub fn build_call<L: LedgerClient + ?Sized>(
        &self,
        from: Address,
        contract: Address,
        data: Vec<u8>,
        value: U256,
        ledger: &L,
    ) -> Result<UnsignedTransaction, EthError> {
        self.build(
            from,
            TxKind::Call {
                contract,
                data,
                value,
            },
            ledger,
        )
    }

    /// Builds a contract creation. The recipient is left empty.
    pub fn build_deployment<L: LedgerClient + ?Sized>(
        &self,
        from: Address,
        bytecode: Vec<u8>,
        ledger: &L,
    ) -> Result<UnsignedTransaction, EthError> {
        self.build(from, TxKind::Create { bytecode }, ledger)
    }

    fn build<L: LedgerClient + ?Sized>(
        &self,
        from: Address,
        kind: TxKind,
        ledger: &L,
    ) -> Result<UnsignedTransaction, EthError> {
        let nonce = self.fetch_nonce(from, ledger)?;
        let gas_price = self.fetch_gas_price(ledger)?;
        self.assemble(nonce, gas_price, kind)
    }

    pub fn fetch_nonce<L: LedgerClient + ?Sized>(
        &self,
        from: Address,
        ledger: &L,
    ) -> Result<u64, EthError> {
        let nonce = ledger.pending_nonce(from)?;
        tracing::debug!(%from, nonce, "fetched pending nonce");
        Ok(nonce)
    }

    pub fn fetch_gas_price<L: LedgerClient + ?Sized>(&self, ledger: &L) -> Result<u128, EthError> {
        let gas_price = ledger.suggested_gas_price()?;
        tracing::debug!(gas_price, "fetched gas price");
        Ok(gas_price)
    }

    /// Combines already-fetched chain parameters with the transaction kind.
    pub fn assemble(
        &self,
        nonce: u64,
        gas_price: u128,
        kind: TxKind,
    ) -> Result<UnsignedTransaction, EthError> {
        let gas_limit = self.gas_limit.unwrap_or_else(|| kind.default_gas_limit());

        let (to, value, data) = match kind {
            TxKind::Transfer { to, value } => (Some(to), value, Vec::new()),
            TxKind::Call {
                contract,
                data,
                value,
            } => (Some(contract), value, data),
            TxKind::Create { bytecode } => {
                if bytecode.is_empty() {
                    return Err(EthError::Encoding(
                        "contract creation requires bytecode".into(),
                    ));
                }
                (None, U256::ZERO, bytecode)
            }
        };

        Ok(UnsignedTransaction {
            chain_id: self.chain_id,
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use alloy_primitives::B256;

    use super::*;
    use crate::ledger::{BlockHeader, BlockRef, LedgerError, Receipt};

    /// Answers nonce and gas-price queries from fixed values and records the
    /// order in which they were asked.
    struct StaticLedger {
        nonce: Result<u64, LedgerError>,
        gas_price: Result<u128, LedgerError>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl StaticLedger {
        fn new(nonce: u64, gas_price: u128) -> Self {
            Self {
                nonce: Ok(nonce),
                gas_price: Ok(gas_price),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl LedgerClient for StaticLedger {
        fn pending_nonce(&self, _address: Address) -> Result<u64, LedgerError> {
            self.calls.borrow_mut().push("pending_nonce");
            self.nonce.clone()
        }

        fn suggested_gas_price(&self) -> Result<u128, LedgerError> {
            self.calls.borrow_mut().push("suggested_gas_price");
            self.gas_price.clone()
        }

        fn balance_at(&self, _address: Address, _block: BlockRef) -> Result<U256, LedgerError> {
            unreachable!("builder never queries balances")
        }

        fn header_by_number(&self, _block: BlockRef) -> Result<BlockHeader, LedgerError> {
            unreachable!("builder never queries headers")
        }

        fn transaction_count(&self, _block_hash: B256) -> Result<u64, LedgerError> {
            unreachable!("builder never queries blocks")
        }

        fn submit_raw_transaction(&self, _raw: &[u8]) -> Result<B256, LedgerError> {
            unreachable!("builder never submits")
        }

        fn simulate_call(&self, _to: Address, _payload: &[u8]) -> Result<Vec<u8>, LedgerError> {
            unreachable!("builder never calls")
        }

        fn receipt_for(&self, _hash: B256) -> Result<Option<Receipt>, LedgerError> {
            unreachable!("builder never polls receipts")
        }
    }

    const FROM: Address = Address::repeat_byte(0xaa);
    const TO: Address = Address::repeat_byte(0xbb);

    #[test]
    fn transfer_uses_ledger_parameters_and_default_limit() {
        let ledger = StaticLedger::new(7, 2_000_000_000);
        let tx = TransactionBuilder::new(1337)
            .build_transfer(FROM, TO, U256::from(5u8), &ledger)
            .unwrap();

        assert_eq!(tx.chain_id, 1337);
        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.gas_price, 2_000_000_000);
        assert_eq!(tx.gas_limit, TRANSFER_GAS_LIMIT);
        assert_eq!(tx.to, Some(TO));
        assert_eq!(tx.value, U256::from(5u8));
        assert!(tx.data.is_empty());
    }

    #[test]
    fn nonce_is_fetched_before_gas_price() {
        let ledger = StaticLedger::new(0, 1);
        TransactionBuilder::new(1)
            .build_transfer(FROM, TO, U256::ZERO, &ledger)
            .unwrap();

        assert_eq!(
            *ledger.calls.borrow(),
            vec!["pending_nonce", "suggested_gas_price"]
        );
    }

    #[test]
    fn every_build_refetches_parameters() {
        let ledger = StaticLedger::new(3, 1);
        let builder = TransactionBuilder::new(1);
        builder.build_transfer(FROM, TO, U256::ZERO, &ledger).unwrap();
        builder.build_transfer(FROM, TO, U256::ZERO, &ledger).unwrap();

        assert_eq!(ledger.calls.borrow().len(), 4);
    }

    #[test]
    fn call_sets_recipient_and_payload() {
        let ledger = StaticLedger::new(1, 1);
        let tx = TransactionBuilder::new(1)
            .build_call(FROM, TO, vec![0xde, 0xad], U256::ZERO, &ledger)
            .unwrap();

        assert_eq!(tx.to, Some(TO));
        assert_eq!(tx.data, vec![0xde, 0xad]);
        assert_eq!(tx.gas_limit, CONTRACT_GAS_LIMIT);
    }

    #[test]
    fn deployment_leaves_recipient_empty() {
        let ledger = StaticLedger::new(0, 1);
        let tx = TransactionBuilder::new(1)
            .build_deployment(FROM, vec![0x60, 0x80], &ledger)
            .unwrap();

        assert!(tx.is_deployment());
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.data, vec![0x60, 0x80]);
    }

    #[test]
    fn deployment_without_bytecode_is_rejected() {
        let ledger = StaticLedger::new(0, 1);
        let result = TransactionBuilder::new(1).build_deployment(FROM, Vec::new(), &ledger);
        assert!(matches!(result, Err(EthError::Encoding(_))));
    }

    #[test]
    fn gas_limit_override_applies() {
        let ledger = StaticLedger::new(0, 1);
        let tx = TransactionBuilder::new(1)
            .with_gas_limit(50_000)
            .build_transfer(FROM, TO, U256::ZERO, &ledger)
            .unwrap();

        assert_eq!(tx.gas_limit, 50_000);
    }

    #[test]
    fn nonce_transport_failure_is_ledger_unavailable() {
        let ledger = StaticLedger {
            nonce: Err(LedgerError::Transport("connection refused".into())),
            ..StaticLedger::new(0, 1)
        };
        let err = TransactionBuilder::new(1)
            .build_transfer(FROM, TO, U256::ZERO, &ledger)
            .unwrap_err();

        assert!(matches!(err, EthError::LedgerUnavailable(_)));
        // Gas price is never asked for once the nonce query failed.
        assert_eq!(*ledger.calls.borrow(), vec!["pending_nonce"]);
    }

    #[test]
    fn gas_price_failure_propagates() {
        let ledger = StaticLedger {
            gas_price: Err(LedgerError::NotFound("eth_gasPrice".into())),
            ..StaticLedger::new(0, 1)
        };
        let err = TransactionBuilder::new(1)
            .build_call(FROM, TO, vec![1], U256::ZERO, &ledger)
            .unwrap_err();

        assert!(err.is_transient());
    }
}
