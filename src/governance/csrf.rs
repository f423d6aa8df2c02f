use super::auth::constant_time_eq;
use crate::error::{IronlayerError, Result};
use rand::RngCore;

/// Double-submit cookie CSRF pattern (spec.md §4.7): on safe methods a
/// fresh token is issued when no cookie exists; on state-changing methods
/// authenticated by cookie, the header value must match the cookie via
/// constant-time compare. Bearer/API-key authenticated requests carry no
/// ambient credential and bypass this check entirely.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn verify(cookie_value: &str, header_value: &str) -> Result<()> {
    if constant_time_eq(cookie_value.as_bytes(), header_value.as_bytes()) {
        Ok(())
    } else {
        Err(IronlayerError::Csrf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCarrier {
    Cookie,
    Bearer,
    ApiKey,
}

pub fn requires_csrf_check(carrier: AuthCarrier, is_state_changing: bool) -> bool {
    is_state_changing && carrier == AuthCarrier::Cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_cookie_and_header_pass() {
        let token = generate_token();
        assert!(verify(&token, &token).is_ok());
    }

    #[test]
    fn mismatched_header_fails() {
        let err = verify(&generate_token(), &generate_token()).unwrap_err();
        assert_eq!(err.kind(), "CSRF_ERROR");
    }

    #[test]
    fn bearer_auth_bypasses_csrf() {
        assert!(!requires_csrf_check(AuthCarrier::Bearer, true));
        assert!(requires_csrf_check(AuthCarrier::Cookie, true));
        assert!(!requires_csrf_check(AuthCarrier::Cookie, false));
    }
}
