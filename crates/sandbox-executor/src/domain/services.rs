//! # Domain Services
//!
//! Pure, deterministic functions behind the host's crypto and addressing
//! operations. No I/O, no shared state.

use crate::domain::entities::AnyDb;
use crate::domain::value_objects::{Address, Hash};
use crate::errors::HostError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

/// Length of a recoverable signature: `r ‖ s ‖ recovery id`.
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

// =============================================================================
// DIGESTS
// =============================================================================

/// SHA3-256 digest.
#[must_use]
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    Sha3_256::digest(data).into()
}

/// SHA-256 digest.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

// =============================================================================
// KEY RECOVERY
// =============================================================================

/// Recovers the secp256k1 public key that produced `signature` over `msg_hash`.
///
/// Returns the SEC1 encoding: 33 bytes if `compressed`, else 65 bytes.
///
/// # Errors
///
/// `InvalidSignature` if the hash is not 32 bytes, the signature is not 65
/// bytes, or no key can be recovered.
pub fn recover_key(
    msg_hash: &[u8],
    signature: &[u8],
    compressed: bool,
) -> Result<Vec<u8>, HostError> {
    if msg_hash.len() != 32 {
        return Err(HostError::InvalidSignature(format!(
            "message hash must be 32 bytes, got {}",
            msg_hash.len()
        )));
    }
    if signature.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(HostError::InvalidSignature(format!(
            "signature must be {RECOVERABLE_SIGNATURE_LEN} bytes, got {}",
            signature.len()
        )));
    }
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| HostError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature[64])
        .ok_or_else(|| HostError::InvalidSignature("bad recovery id".to_owned()))?;
    let key = VerifyingKey::recover_from_prehash(msg_hash, &sig, recovery_id)
        .map_err(|e| HostError::InvalidSignature(e.to_string()))?;
    Ok(key.to_encoded_point(compressed).as_bytes().to_vec())
}

// =============================================================================
// ADDRESS DERIVATION
// =============================================================================

/// Derives the account address for a public key (compressed or uncompressed).
///
/// Address body = `sha3_256(uncompressed key without 0x04)`\[12:\]
///
/// # Errors
///
/// `InvalidPublicKey` if the bytes are not a valid SEC1 point.
pub fn address_from_key(public_key: &[u8]) -> Result<Address, HostError> {
    let key = VerifyingKey::from_sec1_bytes(public_key).map_err(|_| HostError::InvalidPublicKey)?;
    let point = key.to_encoded_point(false);
    let digest = sha3_256(&point.as_bytes()[1..]);
    let mut body = [0u8; 20];
    body.copy_from_slice(&digest[12..]);
    Ok(Address::account(body))
}

/// Derives the address of a newly deployed contract.
///
/// Address body = `sha3_256(owner ‖ salt)`\[12:\]
#[must_use]
pub fn derive_contract_address(owner: &Address, salt: &[u8]) -> Address {
    let mut data = Vec::with_capacity(Address::LEN + salt.len());
    data.extend_from_slice(owner.as_bytes());
    data.extend_from_slice(salt);
    let digest = sha3_256(&data);
    let mut body = [0u8; 20];
    body.copy_from_slice(&digest[12..]);
    Address::contract(body)
}

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Digest under which `key` of `db` is stored.
///
/// Digest = `sha3_256(contract ‖ id ‖ 0x00 ‖ key)`
#[must_use]
pub fn storage_key(db: &AnyDb, key: &[u8]) -> Hash {
    let mut data = Vec::with_capacity(Address::LEN + db.id.len() + 1 + key.len());
    data.extend_from_slice(db.contract.as_bytes());
    data.extend_from_slice(db.id.as_bytes());
    data.push(0);
    data.extend_from_slice(key);
    Hash::new(sha3_256(&data))
}

// =============================================================================
// TESTS
// =============================================================================
