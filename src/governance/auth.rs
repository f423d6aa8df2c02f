use crate::error::{IronlayerError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    User,
    Service,
}

/// The authenticated principal behind a request, carried on every bearer
/// token (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub sub: String,
    pub tenant_id: Uuid,
    pub identity_kind: IdentityKind,
    pub role: super::rbac::Role,
    pub scopes: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// A bearer token before signature/claims verification.
pub struct RawToken<'a> {
    pub header_and_payload: &'a str,
    pub signature_b64: &'a str,
    pub claims: Identity,
}

/// Verifies bearer tokens. Dev mode signs/verifies with a shared HMAC
/// secret; production verifies against an OIDC issuer's published keys.
/// Both are behind the same trait so the governance layer never branches
/// on `AuthMode` outside of construction.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &RawToken) -> Result<()>;
}

type HmacSha256 = Hmac<Sha256>;

pub struct HmacVerifier {
    secret: Vec<u8>,
}

impl HmacVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn sign(&self, header_and_payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| IronlayerError::Unexpected(e.to_string()))?;
        mac.update(header_and_payload.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

impl TokenVerifier for HmacVerifier {
    fn verify(&self, token: &RawToken) -> Result<()> {
        let expected = self.sign(token.header_and_payload)?;
        if constant_time_eq(expected.as_bytes(), token.signature_b64.as_bytes()) {
            Ok(())
        } else {
            Err(IronlayerError::Unauthorized)
        }
    }
}

/// Placeholder for the production path: verification against an OIDC
/// issuer's JWKS is a network-bound collaborator concern (spec.md §1 lists
/// HTTP transport as out of scope), so this crate defines the seam and
/// leaves key-set retrieval to the embedding service.
pub struct OidcVerifier {
    pub issuer: String,
}

impl TokenVerifier for OidcVerifier {
    fn verify(&self, _token: &RawToken) -> Result<()> {
        Err(IronlayerError::CollaboratorUnavailable(format!(
            "OIDC verification against issuer '{}' requires a key-set collaborator",
            self.issuer
        )))
    }
}

/// An API key presents as an opaque token; lookup is by a deterministic
/// prefix (so the store can index it) then a constant-time compare against
/// the stored hash (spec.md §4.7).
pub struct ApiKeyRecord {
    pub prefix: String,
    pub hash: String,
}

pub fn api_key_prefix(raw_key: &str, prefix_len: usize) -> &str {
    let end = raw_key.char_indices().nth(prefix_len).map(|(i, _)| i).unwrap_or(raw_key.len());
    &raw_key[..end]
}

pub fn verify_api_key(raw_key: &str, record: &ApiKeyRecord, hasher: impl Fn(&str) -> String) -> bool {
    let candidate = hasher(raw_key);
    constant_time_eq(candidate.as_bytes(), record.hash.as_bytes())
}

/// Branch-free byte comparison so early mismatches don't leak timing
/// information about how many leading bytes matched.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"abcdef", b"abcdef"));
    }

    #[test]
    fn constant_time_eq_rejects_mismatch() {
        assert!(!constant_time_eq(b"abcdef", b"abcxef"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn hmac_round_trips() {
        let verifier = HmacVerifier::new("shared-secret");
        let sig = verifier.sign("header.payload").unwrap();
        let token = RawToken {
            header_and_payload: "header.payload",
            signature_b64: &sig,
            claims: Identity {
                sub: "u1".into(),
                tenant_id: Uuid::nil(),
                identity_kind: IdentityKind::User,
                role: super::super::rbac::Role::Viewer,
                scopes: vec![],
                jti: "j1".into(),
                iat: 0,
                exp: 0,
            },
        };
        assert!(verifier.verify(&token).is_ok());
    }
}
