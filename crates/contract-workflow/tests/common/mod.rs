//! In-memory ledger used by the integration tests.
//!
//! Mines every accepted transaction into its own block immediately and runs a
//! tiny built-in `Store` contract:
//!
//! ```solidity
//! contract Store {
//!     string public version;
//!     mapping (bytes32 => bytes32) public items;
//!     constructor(string memory _version) { version = _version; }
//!     function setItem(bytes32 key, bytes32 value) external { items[key] = value; }
//! }
//! ```
//!
//! Transactions are decoded and their sender recovered exactly as a node
//! would, so chain id, nonce and balance checks are real.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::{Address, B256, U256};
use chain_eth::abi::{self, AbiType, AbiValue};
use chain_eth::address::contract_address;
use chain_eth::ledger::{BlockHeader, BlockRef, LedgerClient, LedgerError, Receipt};
use chain_eth::transaction::SignedTransaction;
use contract_workflow::{ContractArtifact, Function};
use sha3::{Digest, Keccak256};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const CHAIN_ID: u64 = 1337;
pub const GAS_PRICE: u128 = 1_000_000_000;

/// Stand-in for compiled `Store` creation code. The ledger recognises it as a
/// prefix of the creation payload; what follows is the constructor argument.
pub const STORE_BYTECODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15];

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const BLOCK_TIME: u64 = 12;
const BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// 100 ether.
pub fn faucet_amount() -> U256 {
    U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contract_workflow=debug,chain_eth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

pub fn store_functions() -> Vec<Function> {
    vec![
        Function::new(
            "setItem",
            vec![AbiType::FixedBytes32, AbiType::FixedBytes32],
            vec![],
        ),
        Function::new("items", vec![AbiType::FixedBytes32], vec![AbiType::FixedBytes32]),
        Function::new("version", vec![], vec![AbiType::String]),
    ]
}

pub fn store_artifact() -> ContractArtifact {
    ContractArtifact::new(STORE_BYTECODE.to_vec(), vec![AbiType::String], store_functions())
}

#[derive(Debug, Default, Clone)]
struct Store {
    version: String,
    items: HashMap<[u8; 32], [u8; 32]>,
}

#[derive(Debug, Clone)]
struct Block {
    header: BlockHeader,
    transactions: Vec<B256>,
    /// Balances as of the end of this block.
    balances: HashMap<Address, U256>,
}

#[derive(Debug, Default)]
struct State {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Store>,
    receipts: HashMap<B256, Receipt>,
    blocks: Vec<Block>,
    offline: bool,
}

pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        let mut state = State::default();
        let genesis = BlockHeader {
            number: 0,
            hash: block_hash(0, B256::ZERO, &[]),
            parent_hash: B256::ZERO,
            timestamp: GENESIS_TIMESTAMP,
            gas_limit: BLOCK_GAS_LIMIT,
            gas_used: 0,
        };
        state.blocks.push(Block {
            header: genesis,
            transactions: Vec::new(),
            balances: HashMap::new(),
        });
        Self {
            state: Mutex::new(state),
        }
    }

    /// Credits `address` out of thin air in a block of its own.
    pub fn fund(&self, address: Address, amount: U256) {
        let mut state = self.state.lock().unwrap();
        *state.balances.entry(address).or_default() += amount;
        state.mine(None, 0);
    }

    /// While offline every query fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn block_number(&self) -> u64 {
        self.state.lock().unwrap().head().header.number
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        f(&mut state)
    }
}

impl State {
    fn head(&self) -> &Block {
        self.blocks.last().unwrap()
    }

    fn block(&self, block: BlockRef) -> Result<&Block, LedgerError> {
        match block {
            BlockRef::Latest | BlockRef::Pending => Ok(self.head()),
            BlockRef::Earliest => Ok(&self.blocks[0]),
            BlockRef::Number(n) => self
                .blocks
                .get(n as usize)
                .ok_or_else(|| LedgerError::NotFound(format!("block {n}"))),
        }
    }

    fn mine(&mut self, tx: Option<B256>, gas_used: u64) -> u64 {
        let parent = self.head().header.clone();
        let number = parent.number + 1;
        let transactions: Vec<B256> = tx.into_iter().collect();
        let header = BlockHeader {
            number,
            hash: block_hash(number, parent.hash, &transactions),
            parent_hash: parent.hash,
            timestamp: parent.timestamp + BLOCK_TIME,
            gas_limit: BLOCK_GAS_LIMIT,
            gas_used,
        };
        let balances = self.balances.clone();
        self.blocks.push(Block {
            header,
            transactions,
            balances,
        });
        number
    }

    fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    /// Runs the transaction body. `Ok(Some(addr))` for a created contract,
    /// `Err` for a revert.
    fn execute(
        &mut self,
        sender: Address,
        tx: &SignedTransaction,
    ) -> Result<Option<Address>, String> {
        let unsigned = tx.transaction();
        match unsigned.to {
            None => {
                let args = unsigned
                    .data
                    .strip_prefix(STORE_BYTECODE)
                    .ok_or("unknown creation code")?;
                let version = abi::decode(&[AbiType::String], args).map_err(|e| e.to_string())?;
                let version = version[0].as_str().unwrap_or_default().to_string();
                let address = contract_address(sender, unsigned.nonce);
                self.contracts.insert(
                    address,
                    Store {
                        version,
                        items: HashMap::new(),
                    },
                );
                Ok(Some(address))
            }
            Some(to) => {
                if let Some(store) = self.contracts.get_mut(&to) {
                    let (selector, args) = split_call(&unsigned.data)?;
                    if selector != abi::function_selector("setItem(bytes32,bytes32)") {
                        return Err("unknown selector".into());
                    }
                    let values = abi::decode(&[AbiType::FixedBytes32, AbiType::FixedBytes32], args)
                        .map_err(|e| e.to_string())?;
                    let key = *values[0].as_fixed_bytes32().ok_or("bad key")?;
                    let value = *values[1].as_fixed_bytes32().ok_or("bad value")?;
                    store.items.insert(key, value);
                }
                *self.balances.entry(to).or_default() += unsigned.value;
                Ok(None)
            }
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for MemoryLedger {
    fn pending_nonce(&self, address: Address) -> Result<u64, LedgerError> {
        self.with_state(|state| Ok(state.nonces.get(&address).copied().unwrap_or(0)))
    }

    fn suggested_gas_price(&self) -> Result<u128, LedgerError> {
        self.with_state(|_| Ok(GAS_PRICE))
    }

    fn balance_at(&self, address: Address, block: BlockRef) -> Result<U256, LedgerError> {
        self.with_state(|state| {
            let block = state.block(block)?;
            Ok(block.balances.get(&address).copied().unwrap_or_default())
        })
    }

    fn header_by_number(&self, block: BlockRef) -> Result<BlockHeader, LedgerError> {
        self.with_state(|state| Ok(state.block(block)?.header.clone()))
    }

    fn transaction_count(&self, block_hash: B256) -> Result<u64, LedgerError> {
        self.with_state(|state| {
            state
                .blocks
                .iter()
                .find(|b| b.header.hash == block_hash)
                .map(|b| b.transactions.len() as u64)
                .ok_or_else(|| LedgerError::NotFound(format!("block {block_hash}")))
        })
    }

    fn submit_raw_transaction(&self, raw: &[u8]) -> Result<B256, LedgerError> {
        self.with_state(|state| {
            let tx = SignedTransaction::decode(raw)
                .map_err(|e| LedgerError::Rejected(format!("invalid transaction: {e}")))?;
            let unsigned = tx.transaction().clone();
            if unsigned.chain_id != CHAIN_ID {
                return Err(LedgerError::Rejected("invalid chain id for signer".into()));
            }
            let sender = tx
                .recover_sender()
                .map_err(|e| LedgerError::Rejected(format!("invalid sender: {e}")))?;

            let expected = state.nonces.get(&sender).copied().unwrap_or(0);
            if unsigned.nonce < expected {
                return Err(LedgerError::Rejected("nonce too low".into()));
            }
            if unsigned.nonce > expected {
                return Err(LedgerError::Rejected("nonce too high".into()));
            }
            if unsigned.gas_limit < 21_000 {
                return Err(LedgerError::Rejected("intrinsic gas too low".into()));
            }
            let cost = unsigned.max_fee() + unsigned.value;
            if state.balance(sender) < cost {
                return Err(LedgerError::Rejected(
                    "insufficient funds for gas * price + value".into(),
                ));
            }

            // Charge the full gas limit; refunds are not modelled.
            let fee = unsigned.max_fee();
            *state.balances.entry(sender).or_default() -= fee;
            state.nonces.insert(sender, expected + 1);

            // A revert undoes the value transfer and storage writes, not the fee.
            let snapshot = (state.balances.clone(), state.contracts.clone());
            *state.balances.entry(sender).or_default() -= unsigned.value;
            let (status, created) = match state.execute(sender, &tx) {
                Ok(created) => (true, created),
                Err(reason) => {
                    tracing::debug!(%reason, "execution reverted");
                    state.balances = snapshot.0;
                    state.contracts = snapshot.1;
                    (false, None)
                }
            };

            let hash = tx.hash();
            let block_number = state.mine(Some(hash), unsigned.gas_limit);
            state.receipts.insert(
                hash,
                Receipt {
                    transaction_hash: hash,
                    block_number,
                    status,
                    gas_used: unsigned.gas_limit,
                    contract_address: created,
                },
            );
            Ok(hash)
        })
    }

    fn simulate_call(&self, to: Address, payload: &[u8]) -> Result<Vec<u8>, LedgerError> {
        self.with_state(|state| {
            let Some(store) = state.contracts.get(&to) else {
                return Ok(Vec::new());
            };
            let (selector, args) =
                split_call(payload).map_err(LedgerError::Rejected)?;

            if selector == abi::function_selector("version()") {
                return Ok(abi::encode_params(&[AbiValue::String(store.version.clone())]));
            }
            if selector == abi::function_selector("items(bytes32)") {
                let key = abi::decode(&[AbiType::FixedBytes32], args)
                    .map_err(|e| LedgerError::Rejected(e.to_string()))?;
                let key = key[0].as_fixed_bytes32().copied().unwrap_or_default();
                let value = store.items.get(&key).copied().unwrap_or([0u8; 32]);
                return Ok(abi::encode_params(&[AbiValue::FixedBytes32(value)]));
            }
            Err(LedgerError::Rejected("execution reverted".into()))
        })
    }

    fn receipt_for(&self, hash: B256) -> Result<Option<Receipt>, LedgerError> {
        self.with_state(|state| Ok(state.receipts.get(&hash).cloned()))
    }
}

fn split_call(data: &[u8]) -> Result<([u8; 4], &[u8]), String> {
    if data.len() < 4 {
        return Err("call data shorter than a selector".into());
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Ok((selector, &data[4..]))
}

fn block_hash(number: u64, parent: B256, transactions: &[B256]) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(number.to_be_bytes());
    hasher.update(parent);
    for tx in transactions {
        hasher.update(tx);
    }
    B256::from_slice(&hasher.finalize())
}
