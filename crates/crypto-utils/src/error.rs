use thiserror::Error;

/// Low-level cryptographic utility errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
