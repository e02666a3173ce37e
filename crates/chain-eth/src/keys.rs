use std::fmt;

use alloy_primitives::Address;
use crypto_utils::random::try_random_bytes_fixed;
use crypto_utils::zeroizing::{ZeroizingBytes, ZeroizingString};
use k256::ecdsa::SigningKey;
use zeroize::Zeroize;

use crate::address::address_from_coordinates;
use crate::error::EthError;

/// Upper bound on rejection-sampling rounds in [`KeyPair::generate`].
///
/// A uniformly random 32-byte string falls outside [1, n-1] with probability
/// below 2^-127, so hitting this bound means the entropy source is broken.
const MAX_GENERATE_ATTEMPTS: usize = 16;

/// A secp256k1 key pair.
///
/// The private scalar lives inside a k256 [`SigningKey`], which zeroizes on
/// drop. The public point is cached as its 64 coordinate bytes.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: [u8; 64],
}

impl KeyPair {
    /// Generates a fresh key pair from the OS entropy source.
    pub fn generate() -> Result<Self, EthError> {
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let mut candidate: [u8; 32] = try_random_bytes_fixed()?;
            let parsed = SigningKey::from_bytes((&candidate).into());
            candidate.zeroize();

            if let Ok(signing_key) = parsed {
                return Ok(Self::from_signing_key(signing_key));
            }
        }

        Err(EthError::Entropy(
            "entropy source produced no valid scalar".into(),
        ))
    }

    /// Parses a hex-encoded private key, with or without `0x` prefix.
    pub fn from_private_key_hex(private_key_hex: &str) -> Result<Self, EthError> {
        let bytes = ZeroizingBytes::from_hex(private_key_hex)?;
        Self::from_bytes(&bytes)
    }

    /// Builds a key pair from a raw 32-byte big-endian scalar.
    ///
    /// Rejects any other length, zero, and values not below the curve order.
    pub fn from_bytes(private_key: &[u8]) -> Result<Self, EthError> {
        if private_key.len() != 32 {
            return Err(EthError::MalformedKey(format!(
                "expected 32 private key bytes, got {}",
                private_key.len()
            )));
        }

        let signing_key = SigningKey::from_slice(private_key).map_err(|_| {
            EthError::MalformedKey("scalar is zero or not below the curve order".into())
        })?;

        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let encoded = signing_key.verifying_key().to_encoded_point(false);
        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&encoded.as_bytes()[1..]);

        Self {
            signing_key,
            public_key,
        }
    }

    /// Uncompressed public point without the 0x04 prefix (x ‖ y).
    pub fn public_key(&self) -> &[u8; 64] {
        &self.public_key
    }

    pub fn address(&self) -> Address {
        address_from_coordinates(&self.public_key)
    }

    /// Hex encoding of the private scalar (no `0x` prefix).
    ///
    /// This is the only way key material leaves a `KeyPair`; the returned
    /// string is zeroed on drop.
    pub fn export_private_key(&self) -> ZeroizingString {
        let mut bytes = self.signing_key.to_bytes();
        let hex = ZeroizingBytes::from(bytes.as_slice()).to_hex();
        bytes.as_mut_slice().zeroize();
        hex
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
