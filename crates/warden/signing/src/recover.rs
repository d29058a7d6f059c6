//! Recoverable secp256k1 ECDSA
//!
//! Signatures travel as 65 bytes of r ‖ s ‖ v. Verification rejects the
//! malleable half of the signature space: `s` must be in the low half of
//! the curve order and `v` must be 27 or 28. The signer's principal is
//! the trailing 20 bytes of the keccak of the uncompressed public key.

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use warden_types::SIGNATURE_LEN;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("non-canonical signature: {0}")]
    NonCanonical(&'static str),

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("signing failed")]
    SigningFailed,
}

/// Recover the principal that signed `digest`.
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength(signature.len()));
    }
    let parsed = Signature::from_slice(&signature[..64])
        .map_err(|_| SignatureError::NonCanonical("r or s out of range"))?;
    if parsed.normalize_s().is_some() {
        return Err(SignatureError::NonCanonical("s in the high half of the order"));
    }
    let v = signature[64];
    if v != 27 && v != 28 {
        return Err(SignatureError::NonCanonical("v must be 27 or 28"));
    }
    let recovery_id =
        RecoveryId::from_byte(v - 27).ok_or(SignatureError::NonCanonical("recovery id"))?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &parsed, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_from_key(&key))
}

/// Produce an r ‖ s ‖ v signature over `digest`.
pub fn sign_digest(key: &SigningKey, digest: &B256) -> Result<[u8; SIGNATURE_LEN], SignatureError> {
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .map_err(|_| SignatureError::SigningFailed)?;
    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = 27 + recovery_id.to_byte();
    Ok(out)
}

/// Principal controlled by a signing key.
pub fn address_of(key: &SigningKey) -> Address {
    address_from_key(key.verifying_key())
}

fn address_from_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
