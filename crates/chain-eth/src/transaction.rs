use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable, EMPTY_STRING_CODE};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// An unsigned legacy Ethereum transaction with EIP-155 replay protection.
///
/// `to == None` marks a contract creation; `data` then carries the creation
/// bytecode with constructor arguments appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    /// Wei per unit of gas.
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Option<Address>,
    /// Transfer value in wei.
    pub value: U256,
    pub data: Vec<u8>,
}

impl UnsignedTransaction {
    pub fn is_deployment(&self) -> bool {
        self.to.is_none()
    }

    /// Upper bound on the fee this transaction authorises: `gas_price * gas_limit`.
    pub fn max_fee(&self) -> U256 {
        U256::from(self.gas_price) * U256::from(self.gas_limit)
    }

    /// EIP-155 signing payload:
    /// `rlp([nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0])`.
    pub fn encode_for_signing(&self) -> Vec<u8> {
        let fields = SigningFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: RlpRecipient(self.to),
            value: self.value,
            data: Bytes::copy_from_slice(&self.data),
            chain_id: self.chain_id,
            empty_r: 0,
            empty_s: 0,
        };

        let mut buf = Vec::new();
        fields.encode(&mut buf);
        buf
    }

    /// Keccak-256 of [`encode_for_signing`](Self::encode_for_signing).
    pub fn signing_hash(&self) -> B256 {
        B256::from_slice(&Keccak256::digest(self.encode_for_signing()))
    }
}

/// ECDSA signature components with the public key recovery bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    pub r: U256,
    pub s: U256,
    /// 0 or 1: parity of the ephemeral point's y coordinate.
    pub recovery_id: u8,
}

impl TxSignature {
    /// EIP-155 `v`: `chain_id * 2 + 35 + recovery_id`.
    ///
    /// Fails when `v` does not fit in 64 bits. Any chain id up to
    /// [`MAX_CHAIN_ID`](crate::chains::MAX_CHAIN_ID) fits for both parities.
    pub fn v(&self, chain_id: u64) -> Result<u64, EthError> {
        chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(self.recovery_id)))
            .ok_or_else(|| {
                EthError::Encoding(format!("chain id {chain_id} does not fit in an EIP-155 v"))
            })
    }
}

/// A signed transaction in its broadcastable form.
///
/// Immutable; the hash of the raw encoding identifies it on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: UnsignedTransaction,
    signature: TxSignature,
    raw: Vec<u8>,
    hash: B256,
}

impl SignedTransaction {
    pub(crate) fn new(tx: UnsignedTransaction, signature: TxSignature) -> Result<Self, EthError> {
        let v = signature.v(tx.chain_id)?;
        let fields = LegacyFields {
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: RlpRecipient(tx.to),
            value: tx.value,
            data: Bytes::copy_from_slice(&tx.data),
            v,
            r: signature.r,
            s: signature.s,
        };

        let mut raw = Vec::new();
        fields.encode(&mut raw);
        let hash = B256::from_slice(&Keccak256::digest(&raw));

        Ok(Self {
            tx,
            signature,
            raw,
            hash,
        })
    }

    /// Parses a raw EIP-155 legacy transaction.
    ///
    /// Typed (EIP-2718) envelopes and pre-EIP-155 signatures are rejected.
    pub fn decode(raw: &[u8]) -> Result<Self, EthError> {
        match raw.first() {
            None => return Err(EthError::Decode("empty transaction".into())),
            Some(&b) if b < 0xc0 => {
                return Err(EthError::Decode(format!(
                    "typed transaction 0x{b:02x} is not supported"
                )))
            }
            Some(_) => {}
        }

        let mut buf = raw;
        let fields = LegacyFields::decode(&mut buf)?;
        if !buf.is_empty() {
            return Err(EthError::Decode(format!(
                "{} trailing bytes after transaction",
                buf.len()
            )));
        }

        if fields.v < 35 {
            return Err(EthError::Decode(format!(
                "v = {} carries no chain id (pre-EIP-155)",
                fields.v
            )));
        }

        let chain_id = (fields.v - 35) / 2;
        let recovery_id = ((fields.v - 35) % 2) as u8;

        let tx = UnsignedTransaction {
            chain_id,
            nonce: fields.nonce,
            gas_price: fields.gas_price,
            gas_limit: fields.gas_limit,
            to: fields.to.0,
            value: fields.value,
            data: fields.data.to_vec(),
        };

        Ok(Self {
            tx,
            signature: TxSignature {
                r: fields.r,
                s: fields.s,
                recovery_id,
            },
            raw: raw.to_vec(),
            hash: B256::from_slice(&Keccak256::digest(raw)),
        })
    }

    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.tx
    }

    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    /// RLP bytes ready for `submit_raw_transaction`.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }
}

// ---------------------------------------------------------------------------
// RLP structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct SigningFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpRecipient,
    value: U256,
    data: Bytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable, RlpDecodable)]
struct LegacyFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: RlpRecipient,
    value: U256,
    data: Bytes,
    v: u64,
    r: U256,
    s: U256,
}

/// Recipient field: a 20-byte string, or the empty string for creation.
#[derive(Debug, Clone, Copy)]
struct RlpRecipient(Option<Address>);

impl Encodable for RlpRecipient {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match &self.0 {
            Some(address) => address.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        match &self.0 {
            Some(address) => address.length(),
            None => 1,
        }
    }
}

impl Decodable for RlpRecipient {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        if buf.first() == Some(&EMPTY_STRING_CODE) {
            *buf = &buf[1..];
            return Ok(Self(None));
        }
        Address::decode(buf).map(|address| Self(Some(address)))
    }
}
