//! Transaction signing and public key recovery.
//!
//! Signatures use RFC 6979 deterministic nonces (via k256) with low-S
//! normalisation, so signing the same transaction with the same key always
//! yields the same raw bytes.

use alloy_primitives::{Address, B256, U256};
use k256::ecdsa::signature::hazmat::{PrehashSigner, RandomizedPrehashSigner};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use rand_core::OsRng;

use crate::address::derive_address;
use crate::chains::MAX_CHAIN_ID;
use crate::error::EthError;
use crate::keys::KeyPair;
use crate::transaction::{SignedTransaction, TxSignature, UnsignedTransaction};

/// Nonce resampling rounds after a failed deterministic attempt.
const MAX_RESAMPLE_ATTEMPTS: usize = 4;

/// Signs `tx` with `key`, producing the broadcastable EIP-155 encoding.
///
/// The signing hash covers every unsigned field plus the chain id. The
/// recovery bit is embedded in `v`, so the sender's public key can be
/// recovered from the raw transaction alone.
pub fn sign(tx: &UnsignedTransaction, key: &KeyPair) -> Result<SignedTransaction, EthError> {
    if tx.chain_id > MAX_CHAIN_ID {
        return Err(EthError::Encoding(format!(
            "chain id {} exceeds {MAX_CHAIN_ID}",
            tx.chain_id
        )));
    }
    let hash = tx.signing_hash();
    let signature = sign_hash(&hash, key)?;
    SignedTransaction::new(tx.clone(), signature)
}

/// Signs a 32-byte prehash.
///
/// The first attempt is plain RFC 6979. Should it fail (a zero `r` or `s`),
/// the nonce is resampled with added entropy, bounded by
/// [`MAX_RESAMPLE_ATTEMPTS`], before giving up with [`EthError::Signing`].
pub fn sign_hash(hash: &B256, key: &KeyPair) -> Result<TxSignature, EthError> {
    let signing_key = key.signing_key();

    let first: Result<(Signature, RecoveryId), _> = signing_key.sign_prehash(hash.as_slice());
    let (signature, recovery_id) = match first {
        Ok(pair) => pair,
        Err(first_err) => {
            tracing::warn!(error = %first_err, "deterministic signature failed, resampling nonce");
            resample(hash, key)?
        }
    };

    Ok(TxSignature {
        r: U256::from_be_slice(&signature.r().to_bytes()),
        s: U256::from_be_slice(&signature.s().to_bytes()),
        recovery_id: recovery_id.to_byte(),
    })
}

fn resample(hash: &B256, key: &KeyPair) -> Result<(Signature, RecoveryId), EthError> {
    let signing_key = key.signing_key();
    let mut last_err = String::new();

    for attempt in 1..=MAX_RESAMPLE_ATTEMPTS {
        let resampled =
            RandomizedPrehashSigner::<Signature>::sign_prehash_with_rng(signing_key, &mut OsRng, hash.as_slice());
        let signature = match resampled {
            Ok(sig) => sig,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "resampled signature failed");
                last_err = e.to_string();
                continue;
            }
        };

        if let Some(recovery_id) = find_recovery_id(hash, &signature, signing_key.verifying_key()) {
            return Ok((signature, recovery_id));
        }
        last_err = "no recovery id reproduces the signing key".into();
    }

    Err(EthError::Signing(format!(
        "no valid signature after {MAX_RESAMPLE_ATTEMPTS} resampled nonces: {last_err}"
    )))
}

fn find_recovery_id(hash: &B256, signature: &Signature, expected: &VerifyingKey) -> Option<RecoveryId> {
    (0u8..=1).filter_map(RecoveryId::from_byte).find(|&id| {
        VerifyingKey::recover_from_prehash(hash.as_slice(), signature, id)
            .map(|recovered| &recovered == expected)
            .unwrap_or(false)
    })
}

/// Recovers the 64-byte public point (x ‖ y) that produced `signature` over
/// `hash`.
pub fn recover_public_key(hash: &B256, signature: &TxSignature) -> Result<[u8; 64], EthError> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r.to_be_bytes::<32>());
    rs[32..].copy_from_slice(&signature.s.to_be_bytes::<32>());
    let sig = Signature::from_slice(&rs)
        .map_err(|e| EthError::Signing(format!("invalid signature: {e}")))?;

    let recovery_id = RecoveryId::from_byte(signature.recovery_id)
        .ok_or_else(|| EthError::Signing(format!("invalid recovery id {}", signature.recovery_id)))?;

    let recovered = VerifyingKey::recover_from_prehash(hash.as_slice(), &sig, recovery_id)
        .map_err(|e| EthError::Signing(format!("recovery failed: {e}")))?;

    let encoded = recovered.to_encoded_point(false);
    let mut public_key = [0u8; 64];
    public_key.copy_from_slice(&encoded.as_bytes()[1..]);
    Ok(public_key)
}

impl SignedTransaction {
    /// Public key of the account that signed this transaction.
    pub fn recover_public_key(&self) -> Result<[u8; 64], EthError> {
        recover_public_key(&self.transaction().signing_hash(), self.signature())
    }

    /// Address of the account that signed this transaction.
    pub fn recover_sender(&self) -> Result<Address, EthError> {
        derive_address(&self.recover_public_key()?)
    }
}
