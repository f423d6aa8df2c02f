use crate::error::{IronlayerError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `hmac_sha256(secret_plaintext, body)`, hex-encoded, carried in the
/// delivery signature header (spec.md §4.9).
pub fn sign_payload(secret_plaintext: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret_plaintext.as_bytes())
        .map_err(|e| IronlayerError::Unexpected(e.to_string()))?;
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Secrets are stored bcrypt-hashed at rest (spec.md §4.9). Bcrypt is
/// one-way, so this hash is used only to verify a secret a caller presents
/// back (e.g. when confirming a rotation) — the plaintext needed to sign
/// outbound deliveries is the embedding service's responsibility to keep
/// available (a secrets-manager concern out of this crate's scope), not
/// something this crate recovers from the stored hash.
pub fn hash_secret_for_storage(secret_plaintext: &str) -> Result<String> {
    bcrypt::hash(secret_plaintext, bcrypt::DEFAULT_COST)
        .map_err(|e| IronlayerError::Unexpected(e.to_string()))
}

pub fn verify_secret(secret_plaintext: &str, stored_hash: &str) -> Result<bool> {
    bcrypt::verify(secret_plaintext, stored_hash).map_err(|e| IronlayerError::Unexpected(e.to_string()))
}
