//! Ethereum/EVM client core.
//!
//! This crate provides:
//! - secp256k1 key pairs and address derivation (with EIP-55 checksums)
//! - Legacy transaction building with EIP-155 replay protection
//! - Deterministic signing and sender recovery
//! - The [`ledger::LedgerClient`] capability every remote operation goes through
//! - Minimal ABI encoding and decoding for contract calls
//! - EVM network definitions

pub mod abi;
pub mod account;
pub mod address;
pub mod builder;
pub mod chains;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod signer;
pub mod transaction;

pub use account::Account;
pub use builder::{TransactionBuilder, TxKind};
pub use error::EthError;
pub use keys::KeyPair;
pub use ledger::{BlockHeader, BlockRef, LedgerClient, LedgerError, Receipt};
pub use transaction::{SignedTransaction, TxSignature, UnsignedTransaction};
