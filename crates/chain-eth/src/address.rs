use alloy_primitives::Address;
use alloy_rlp::{Encodable, RlpEncodable};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Derives the account address for a secp256k1 public point.
///
/// Accepts either the 64 raw coordinate bytes (x ‖ y) or the 65-byte SEC1
/// uncompressed form starting with 0x04. The point must lie on the curve.
///
/// The address is the last 20 bytes of Keccak-256 over the 64 coordinate
/// bytes; the 0x04 prefix is never hashed.
pub fn derive_address(public_point: &[u8]) -> Result<Address, EthError> {
    let coordinates = validate_public_point(public_point)?;
    Ok(address_from_coordinates(&coordinates))
}

/// Checks that `public_point` is a well-formed, on-curve uncompressed point and
/// returns its 64 coordinate bytes.
pub fn validate_public_point(public_point: &[u8]) -> Result<[u8; 64], EthError> {
    let mut sec1 = [0u8; 65];
    match public_point.len() {
        64 => {
            sec1[0] = 0x04;
            sec1[1..].copy_from_slice(public_point);
        }
        65 => {
            if public_point[0] != 0x04 {
                return Err(EthError::MalformedKey(
                    "uncompressed key must start with 0x04".into(),
                ));
            }
            sec1.copy_from_slice(public_point);
        }
        n => {
            return Err(EthError::MalformedKey(format!(
                "expected 64 or 65 public key bytes, got {n}"
            )))
        }
    }

    let key = PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| EthError::MalformedKey("point is not on the secp256k1 curve".into()))?;

    // Round-trip through k256 so the coordinates are canonical.
    let encoded = key.to_encoded_point(false);
    let mut coordinates = [0u8; 64];
    coordinates.copy_from_slice(&encoded.as_bytes()[1..]);
    Ok(coordinates)
}

/// Hash-and-truncate step for coordinates already known to be on the curve.
pub(crate) fn address_from_coordinates(coordinates: &[u8; 64]) -> Address {
    let hash = Keccak256::digest(coordinates);
    Address::from_slice(&hash[12..])
}

/// Address of a contract created by `sender` with account nonce `nonce`:
/// the last 20 bytes of `keccak256(rlp([sender, nonce]))`.
pub fn contract_address(sender: Address, nonce: u64) -> Address {
    #[derive(RlpEncodable)]
    struct CreateInput {
        sender: Address,
        nonce: u64,
    }

    let mut buf = Vec::new();
    CreateInput { sender, nonce }.encode(&mut buf);
    let hash = Keccak256::digest(&buf);
    Address::from_slice(&hash[12..])
}

/// Parses a 0x-prefixed, 40-hex-character address.
///
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    if !validate_address(address)? {
        return Err(EthError::InvalidAddress(format!(
            "checksum mismatch for {address}"
        )));
    }

    let bytes = hex::decode(&address[2..])
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
    Ok(Address::from_slice(&bytes))
}

/// Validates an address string.
///
/// Checks the `0x` + 40 hex character format. If the address contains mixed
/// case, the EIP-55 checksum is verified and `Ok(false)` is returned on
/// mismatch.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(EthError::InvalidAddress(
            "address must start with 0x".into(),
        ));
    }

    let hex_part = &address[2..];

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());

    if is_all_lower || is_all_upper {
        return Ok(true);
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
    Ok(checksum_address(&Address::from_slice(&bytes))[2..] == *hex_part)
}

/// Renders an address with EIP-55 mixed-case checksum encoding.
pub fn checksum_address(address: &Address) -> String {
    let hex_part = hex::encode(address.as_slice());

    // EIP-55: hash the lowercase hex address (without 0x).
    let hash = Keccak256::digest(hex_part.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_part.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}
