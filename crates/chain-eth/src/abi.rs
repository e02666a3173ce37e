//! Minimal Solidity ABI encoding and decoding.
//!
//! Covers the handful of types contract calls in this workspace need:
//! `address`, `uint256`, `bool`, `bytes32`, dynamic `bytes` and `string`.
//! Parsing ABI JSON is out of scope; callers describe functions in code.

use alloy_primitives::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

const WORD: usize = 32;

/// A Solidity parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiType {
    Address,
    Uint256,
    Bool,
    FixedBytes32,
    Bytes,
    String,
}

impl AbiType {
    /// Name as it appears in a canonical function signature.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            AbiType::Address => "address",
            AbiType::Uint256 => "uint256",
            AbiType::Bool => "bool",
            AbiType::FixedBytes32 => "bytes32",
            AbiType::Bytes => "bytes",
            AbiType::String => "string",
        }
    }

    /// Dynamic types are encoded out-of-line behind an offset word.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, AbiType::Bytes | AbiType::String)
    }
}

/// A typed ABI value, used both as call argument and decoded result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint256(U256),
    Bool(bool),
    FixedBytes32([u8; 32]),
    Bytes(Vec<u8>),
    String(String),
}

impl AbiValue {
    pub fn abi_type(&self) -> AbiType {
        match self {
            AbiValue::Address(_) => AbiType::Address,
            AbiValue::Uint256(_) => AbiType::Uint256,
            AbiValue::Bool(_) => AbiType::Bool,
            AbiValue::FixedBytes32(_) => AbiType::FixedBytes32,
            AbiValue::Bytes(_) => AbiType::Bytes,
            AbiValue::String(_) => AbiType::String,
        }
    }

    pub fn as_fixed_bytes32(&self) -> Option<&[u8; 32]> {
        match self {
            AbiValue::FixedBytes32(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// First four bytes of the Keccak-256 hash of a canonical signature such as
/// `"transfer(address,uint256)"`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Right-pads short text into a `bytes32` word.
pub fn bytes32_from_str(text: &str) -> Result<[u8; 32], EthError> {
    let bytes = text.as_bytes();
    if bytes.len() > WORD {
        return Err(EthError::Encoding(format!(
            "{} bytes do not fit in bytes32",
            bytes.len()
        )));
    }

    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(word)
}

/// Encodes a function call: `selector || encode_params(values)`.
pub fn encode_function_call(selector: [u8; 4], values: &[AbiValue]) -> Vec<u8> {
    let params = encode_params(values);
    let mut data = Vec::with_capacity(4 + params.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&params);
    data
}

/// Encodes a parameter tuple (also used for constructor arguments appended to
/// creation bytecode).
pub fn encode_params(values: &[AbiValue]) -> Vec<u8> {
    let head_len = values.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for value in values {
        match value {
            AbiValue::Bytes(bytes) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                encode_dynamic(bytes, &mut tail);
            }
            AbiValue::String(text) => {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                encode_dynamic(text.as_bytes(), &mut tail);
            }
            static_value => head.extend_from_slice(&encode_static(static_value)),
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn encode_static(value: &AbiValue) -> [u8; 32] {
    let mut word = [0u8; 32];
    match value {
        AbiValue::Address(addr) => {
            // Left-pad: 12 zero bytes + 20 address bytes.
            word[12..].copy_from_slice(addr.as_slice());
        }
        AbiValue::Uint256(v) => word = v.to_be_bytes::<32>(),
        AbiValue::Bool(b) => word[31] = u8::from(*b),
        AbiValue::FixedBytes32(b) => word = *b,
        AbiValue::Bytes(_) | AbiValue::String(_) => unreachable!("dynamic values have no static word"),
    }
    word
}

/// Length word followed by the data right-padded to a word boundary.
fn encode_dynamic(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&usize_word(data.len()));
    out.extend_from_slice(data);
    let padding = (WORD - data.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(padding));
}

fn usize_word(n: usize) -> [u8; 32] {
    U256::from(n as u64).to_be_bytes::<32>()
}

/// Decodes return data according to the declared output types.
pub fn decode(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, EthError> {
    let head_len = types.len() * WORD;
    if data.len() < head_len {
        return Err(EthError::Decode(format!(
            "expected at least {head_len} bytes for {} values, got {}",
            types.len(),
            data.len()
        )));
    }

    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let word = read_word(data, i * WORD)?;
            match ty {
                AbiType::Bytes => decode_dynamic(data, word).map(|b| AbiValue::Bytes(b.to_vec())),
                AbiType::String => {
                    let bytes = decode_dynamic(data, word)?;
                    String::from_utf8(bytes.to_vec())
                        .map(AbiValue::String)
                        .map_err(|e| EthError::Decode(format!("string is not utf-8: {e}")))
                }
                static_type => decode_static(*static_type, word),
            }
        })
        .collect()
}

fn decode_static(ty: AbiType, word: &[u8; 32]) -> Result<AbiValue, EthError> {
    match ty {
        AbiType::Address => {
            if word[..12].iter().any(|&b| b != 0) {
                return Err(EthError::Decode("address word has dirty high bytes".into()));
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiType::Uint256 => Ok(AbiValue::Uint256(U256::from_be_bytes(*word))),
        AbiType::Bool => match U256::from_be_bytes(*word) {
            v if v == U256::ZERO => Ok(AbiValue::Bool(false)),
            v if v == U256::from(1u8) => Ok(AbiValue::Bool(true)),
            _ => Err(EthError::Decode("bool word is neither 0 nor 1".into())),
        },
        AbiType::FixedBytes32 => Ok(AbiValue::FixedBytes32(*word)),
        AbiType::Bytes | AbiType::String => unreachable!("dynamic types are decoded by offset"),
    }
}

fn decode_dynamic<'a>(data: &'a [u8], offset_word: &[u8; 32]) -> Result<&'a [u8], EthError> {
    let offset = word_to_usize(offset_word)?;
    let len = word_to_usize(read_word(data, offset)?)?;
    let start = offset + WORD;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            EthError::Decode(format!(
                "dynamic value of {len} bytes at offset {offset} overruns {} bytes",
                data.len()
            ))
        })?;
    Ok(&data[start..end])
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8; 32], EthError> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| EthError::Decode(format!("no 32-byte word at offset {at}")))
}

fn word_to_usize(word: &[u8; 32]) -> Result<usize, EthError> {
    let too_large = || EthError::Decode("offset or length does not fit in usize".into());
    if word[..24].iter().any(|&b| b != 0) {
        return Err(too_large());
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low)).map_err(|_| too_large())
}
