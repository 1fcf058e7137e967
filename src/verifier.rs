//! Login payload verification.
//!
//! [`LoginVerifier`] checks a widget callback payload in stages: required
//! fields, `auth_date` freshness, then the HMAC over the canonical
//! data-check string. Every failure maps to a typed [`AuthError`] carrying
//! the HTTP status the transport should answer with; nothing panics on
//! untrusted input.

use tracing::warn;

use crate::error::{AuthError, AuthResult};
use crate::payload::{LoginPayload, ResolvedUser};
use crate::signature;
use crate::DEFAULT_AUTH_TTL_SECS;

/// Verifier for Telegram Login Widget payloads.
///
/// # Example
///
/// ```rust
/// use tgauth::{LoginVerifier, LoginPayload};
///
/// let verifier = LoginVerifier::new("123456:bot-token").with_ttl(600);
/// let payload = LoginPayload::from_pairs([
///     ("id", "1000"),
///     ("first_name", "Tester"),
///     ("auth_date", "1700000000"),
///     ("hash", "..."),
/// ]);
///
/// match verifier.verify(&payload, 1700000030) {
///     Ok(user) => println!("authenticated: {}", user.id),
///     Err(e) => eprintln!("rejected ({}): {}", e.http_status_code(), e),
/// }
/// ```
#[derive(Clone)]
pub struct LoginVerifier {
    /// Derived signing key; `None` means the secret was never configured
    /// and every verification answers 500.
    key: Option<[u8; 32]>,

    /// Maximum accepted age of `auth_date` in seconds. `0` disables the
    /// freshness check.
    ttl_seconds: i64,
}

impl LoginVerifier {
    /// Create a verifier from the shared bot token.
    pub fn new(secret: &str) -> Self {
        Self {
            key: Some(signature::derive_key(secret)),
            ttl_seconds: DEFAULT_AUTH_TTL_SECS,
        }
    }

    /// Create a verifier from an optional secret.
    ///
    /// `None` yields a verifier that rejects everything with
    /// [`AuthError::MissingSecret`]. The misconfiguration surfaces at
    /// request time as a 500, not as a startup panic.
    pub fn from_secret(secret: Option<&str>) -> Self {
        match secret {
            Some(s) => Self::new(s),
            None => Self {
                key: None,
                ttl_seconds: DEFAULT_AUTH_TTL_SECS,
            },
        }
    }

    /// Set the freshness window in seconds. `0` disables the check.
    pub fn with_ttl(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// The configured freshness window.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Verify a login payload against the clock `now` (unix seconds).
    ///
    /// Checks, in order: secret configured, required fields present
    /// (fixed order, deterministic messages), `auth_date` parseable and
    /// within the TTL window, HMAC over the data-check string matches the
    /// payload `hash`. On success the caller owns the projected user.
    ///
    /// No lower bound is applied to `auth_date`: a payload dated in the
    /// future passes the freshness check (inherited upstream behavior).
    pub fn verify(&self, payload: &LoginPayload, now: i64) -> AuthResult<ResolvedUser> {
        let key = self.key.as_ref().ok_or(AuthError::MissingSecret)?;

        if let Some(name) = payload.missing_required_field() {
            return Err(AuthError::MissingField(name));
        }

        let auth_date: i64 = payload
            .get("auth_date")
            .ok_or(AuthError::MissingField("auth_date"))?
            .parse()
            .map_err(|_| AuthError::InvalidAuthDate)?;

        if self.ttl_seconds > 0 {
            // Overflow means auth_date is nowhere near a real timestamp.
            let age = now
                .checked_sub(auth_date)
                .ok_or(AuthError::InvalidAuthDate)?;
            if age > self.ttl_seconds {
                warn!(age, ttl = self.ttl_seconds, "rejected stale login payload");
                return Err(AuthError::StaleAuthDate);
            }
        }

        let candidate = payload.get("hash").ok_or(AuthError::MissingField("hash"))?;
        if !signature::verify(key, &payload.data_check_string(), candidate) {
            // Never log the expected MAC; the reason alone is enough.
            warn!("rejected login payload with invalid signature");
            return Err(AuthError::InvalidSignature);
        }

        ResolvedUser::from_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{derive_key, sign};

    const SECRET: &str = "123456:AAEAAeRVTeStToKen";
    const NOW: i64 = 1_700_000_000;

    fn signed_payload(now: i64) -> LoginPayload {
        let mut payload = LoginPayload::from_pairs([
            ("id", "1000".to_string()),
            ("first_name", "Tester".to_string()),
            ("username", "qa_bot".to_string()),
            ("auth_date", now.to_string()),
        ]);
        let hash = sign(&derive_key(SECRET), &payload.data_check_string());
        payload.insert("hash", hash);
        payload
    }

    #[test]
    fn valid_payload_resolves_user() {
        let verifier = LoginVerifier::new(SECRET);
        let user = verifier.verify(&signed_payload(NOW), NOW + 30).unwrap();
        assert_eq!(user.id, 1000);
        assert_eq!(user.first_name, "Tester");
        assert_eq!(user.username.as_deref(), Some("qa_bot"));
    }

    #[test]
    fn missing_secret_is_server_error() {
        let verifier = LoginVerifier::from_secret(None);
        let err = verifier.verify(&signed_payload(NOW), NOW).unwrap_err();
        assert!(matches!(err, AuthError::MissingSecret));
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn missing_field_is_named_deterministically() {
        let verifier = LoginVerifier::new(SECRET);

        let signed = signed_payload(NOW);
        let mut payload = LoginPayload::new();
        for key in ["id", "username", "auth_date", "hash"] {
            payload.insert(key, signed.get(key).unwrap());
        }

        let err = verifier.verify(&payload, NOW).unwrap_err();
        assert!(matches!(err, AuthError::MissingField("first_name")));
        assert_eq!(err.to_string(), "missing field: first_name");
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn unparseable_auth_date_is_bad_request() {
        let verifier = LoginVerifier::new(SECRET);
        let mut payload = signed_payload(NOW);
        payload.insert("auth_date", "yesterday");
        let err = verifier.verify(&payload, NOW).unwrap_err();
        assert!(matches!(err, AuthError::InvalidAuthDate));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn stale_payload_rejected_even_with_valid_signature() {
        let verifier = LoginVerifier::new(SECRET).with_ttl(600);
        let payload = signed_payload(NOW - 1000);
        let err = verifier.verify(&payload, NOW).unwrap_err();
        assert!(matches!(err, AuthError::StaleAuthDate));
        assert_eq!(err.http_status_code(), 401);
    }

    #[test]
    fn zero_ttl_disables_freshness_check() {
        let verifier = LoginVerifier::new(SECRET).with_ttl(0);
        let payload = signed_payload(NOW - 1_000_000);
        assert!(verifier.verify(&payload, NOW).is_ok());
    }

    #[test]
    fn extreme_auth_date_is_rejected_without_panicking() {
        let verifier = LoginVerifier::new(SECRET).with_ttl(600);

        for extreme in [i64::MIN, i64::MIN + 1] {
            let err = verifier.verify(&signed_payload(extreme), NOW).unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidAuthDate),
                "unexpected error for auth_date={extreme}: {err}"
            );
            assert_eq!(err.http_status_code(), 400);
        }
    }

    #[test]
    fn future_auth_date_is_accepted() {
        // Current behavior: the freshness window only bounds age, not
        // forward clock skew. See DESIGN.md.
        let verifier = LoginVerifier::new(SECRET).with_ttl(600);
        let payload = signed_payload(NOW + 5000);
        assert!(verifier.verify(&payload, NOW).is_ok());
    }

    #[test]
    fn forged_hash_rejected() {
        let verifier = LoginVerifier::new(SECRET);
        let mut payload = signed_payload(NOW);
        payload.insert(
            "hash",
            "deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
        );
        let err = verifier.verify(&payload, NOW).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
        assert_eq!(err.http_status_code(), 401);
    }

    #[test]
    fn signature_binds_every_field() {
        let verifier = LoginVerifier::new(SECRET);
        let mut payload = signed_payload(NOW);
        // Tamper a signed field after signing; the old hash must not match.
        payload.insert("username", "admin");
        assert!(matches!(
            verifier.verify(&payload, NOW),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn signature_check_accepts_uppercase_hash() {
        let verifier = LoginVerifier::new(SECRET);
        let mut payload = signed_payload(NOW);
        let upper = payload.get("hash").unwrap().to_uppercase();
        payload.insert("hash", upper);
        assert!(verifier.verify(&payload, NOW).is_ok());
    }

    #[test]
    fn wrong_secret_rejected() {
        let verifier = LoginVerifier::new("000000:OtherBotToken");
        assert!(matches!(
            verifier.verify(&signed_payload(NOW), NOW),
            Err(AuthError::InvalidSignature)
        ));
    }
}
