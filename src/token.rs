//! Stateless session tokens.
//!
//! After a login payload verifies, [`TokenIssuer`] mints a compact bearer
//! token: `base64url(JSON claims) + "." + base64url(HMAC-SHA256)`. The token
//! is self-contained: any verifier holding the same bot token can validate
//! it without a database lookup. There is no revocation at this layer;
//! expiry is the only lifecycle control, and compromise of the secret
//! invalidates the whole scheme.
//!
//! The signing key is the same `SHA256(bot_token)` used for payload
//! verification, tying session integrity to the identity-provider trust
//! root. That coupling is inherited from the source design; see DESIGN.md.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::signature;
use crate::{DEFAULT_TOKEN_LIFETIME_SECS, MAX_TOKEN_LENGTH};

/// Claims carried inside a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: the authenticated Telegram user id
    pub sub: i64,

    /// Issued-at (unix seconds)
    pub iat: i64,

    /// Expiry (unix seconds)
    pub exp: i64,
}

impl SessionClaims {
    /// Remaining validity at `now`, clamped to zero.
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        (self.exp - now).max(0)
    }
}

/// A freshly minted token plus its relative expiry.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The opaque bearer token
    pub token: String,

    /// Seconds until expiry, for the `expires_in` response field
    pub expires_in: i64,
}

/// Issues and verifies session tokens bound to the shared bot token.
#[derive(Clone)]
pub struct TokenIssuer {
    key: [u8; 32],
    lifetime_seconds: i64,
}

impl TokenIssuer {
    /// Create an issuer from the shared bot token.
    pub fn new(secret: &str) -> Self {
        Self {
            key: signature::derive_key(secret),
            lifetime_seconds: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }

    /// Set the token lifetime in seconds (default 3600).
    pub fn with_lifetime(mut self, seconds: i64) -> Self {
        self.lifetime_seconds = seconds;
        self
    }

    /// The configured token lifetime.
    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    /// Mint a token for `user_id` at clock `now`.
    pub fn issue(&self, user_id: i64, now: i64) -> AuthResult<IssuedToken> {
        let claims = SessionClaims {
            sub: user_id,
            iat: now,
            exp: now + self.lifetime_seconds,
        };

        let claims_json = serde_json::to_string(&claims)
            .map_err(|e| AuthError::Internal(format!("failed to serialize claims: {e}")))?;
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
        let mac = signature::sign_raw(&self.key, &claims_b64);

        Ok(IssuedToken {
            token: format!("{}.{}", claims_b64, URL_SAFE_NO_PAD.encode(mac)),
            expires_in: self.lifetime_seconds,
        })
    }

    /// Verify a token at clock `now` and return its claims.
    ///
    /// The signature is recomputed over the claims block and compared in
    /// constant time *before* the claims are decoded. Malformed tokens
    /// (wrong segment count, bad base64, non-JSON claims) answer with
    /// [`AuthError::InvalidToken`] rather than panicking.
    pub fn verify(&self, token: &str, now: i64) -> AuthResult<SessionClaims> {
        // Length cap prevents DoS via oversized tokens
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(AuthError::InvalidToken("token too long".to_string()));
        }

        let mut parts = token.split('.');
        let (claims_b64, mac_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(m), None) => (c, m),
            _ => {
                return Err(AuthError::InvalidToken(
                    "expected claims.signature".to_string(),
                ))
            }
        };

        let candidate = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| AuthError::InvalidToken("signature not base64url".to_string()))?;
        let expected = signature::sign_raw(&self.key, claims_b64);
        if !signature::verify_raw(&expected, &candidate) {
            return Err(AuthError::InvalidSignature);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| AuthError::InvalidToken("claims not base64url".to_string()))?;
        let claims: SessionClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|e| AuthError::InvalidToken(format!("claims not valid JSON: {e}")))?;

        if now > claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}
