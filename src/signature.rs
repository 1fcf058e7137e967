//! Keyed-hash signing primitives.
//!
//! The Telegram Login Widget scheme derives the verification key as
//! `SHA256(bot_token)` and signs the data-check string with HMAC-SHA256,
//! transmitted as lowercase hex. Session tokens reuse the same derived key,
//! tying both checks to a single trust root.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 output length in bytes.
pub const MAC_LENGTH: usize = 32;

/// Derive the signing key from the shared bot token.
///
/// The result must never be logged or persisted separately from the secret
/// it is derived from.
pub fn derive_key(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Compute HMAC-SHA256 over `message`, returned as raw bytes.
pub fn sign_raw(key: &[u8], message: &str) -> [u8; MAC_LENGTH] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().into()
}

/// Compute HMAC-SHA256 over `message`, returned as lowercase hex.
pub fn sign(key: &[u8], message: &str) -> String {
    hex::encode(sign_raw(key, message))
}

/// Verify a hex-encoded HMAC against `message` in constant time.
///
/// The candidate is decoded case-insensitively; a length mismatch returns
/// false immediately. The byte comparison itself is constant-time.
pub fn verify(key: &[u8], message: &str, candidate_hex: &str) -> bool {
    let candidate = match hex::decode(candidate_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    if candidate.len() != MAC_LENGTH {
        return false;
    }

    let expected = sign_raw(key, message);
    candidate.ct_eq(&expected).into()
}

/// Constant-time equality over raw MAC bytes. False on length mismatch.
pub fn verify_raw(expected: &[u8], candidate: &[u8]) -> bool {
    if expected.len() != candidate.len() {
        return false;
    }
    expected.ct_eq(candidate).into()
}
