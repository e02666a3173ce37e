use crypto_utils::CryptoError;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Account, transaction and contract-encoding errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("entropy error: {0}")]
    Entropy(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decode error: {0}")]
    Decode(String),

    /// Transport failure or unknown block/transaction. Retrying with the same
    /// inputs may succeed.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(LedgerError),

    /// The ledger refused the request (bad nonce, gas, funds, revert).
    /// Retrying with the same inputs will fail again.
    #[error("rejected by ledger: {0}")]
    Rejected(String),
}

impl EthError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EthError::LedgerUnavailable(_))
    }
}

impl From<LedgerError> for EthError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(reason) => EthError::Rejected(reason),
            other => EthError::LedgerUnavailable(other),
        }
    }
}

impl From<CryptoError> for EthError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::EntropyUnavailable(msg) => EthError::Entropy(msg),
            CryptoError::InvalidHex(msg) => EthError::MalformedKey(msg),
        }
    }
}

impl From<alloy_rlp::Error> for EthError {
    fn from(e: alloy_rlp::Error) -> Self {
        EthError::Decode(format!("rlp: {e}"))
    }
}
