//! Error types for the tgauth library.

use thiserror::Error;

/// Result type alias for tgauth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and token errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The shared bot token was never configured (operator-fixable)
    #[error("secret not configured")]
    MissingSecret,

    /// A required login payload field is absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// `auth_date` is not a parseable unix timestamp
    #[error("auth_date invalid")]
    InvalidAuthDate,

    /// `auth_date` is older than the configured freshness window
    #[error("stale auth_date")]
    StaleAuthDate,

    /// Payload hash does not match the computed HMAC
    #[error("invalid signature")]
    InvalidSignature,

    /// `id` field is not a parseable integer
    #[error("id invalid")]
    InvalidUserId,

    /// Request body or query string could not be decoded into a payload
    #[error("malformed request: {0}")]
    MalformedBody(String),

    /// Request arrived over an insecure scheme while HTTPS is enforced
    #[error("https required")]
    InsecureTransport,

    /// Session token format is invalid (wrong structure, not base64, etc.)
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Session token has expired
    #[error("token expired")]
    TokenExpired,

    /// Rate limit exceeded
    #[error("rate limit exceeded, retry after {0} seconds")]
    RateLimited(u64),

    /// Known-clients store error
    #[error("database error: {0}")]
    Database(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns true if this error is a client-side problem (4xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::MissingSecret | AuthError::Database(_) | AuthError::Internal(_)
        )
    }

    /// Returns true if this error should be treated as a security event
    /// (forged, tampered, or replayed credentials).
    pub fn is_security_event(&self) -> bool {
        matches!(self, AuthError::InvalidSignature | AuthError::StaleAuthDate)
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            AuthError::MissingSecret => 500,
            AuthError::MissingField(_) => 400,
            AuthError::InvalidAuthDate => 400,
            AuthError::StaleAuthDate => 401,
            AuthError::InvalidSignature => 401,
            AuthError::InvalidUserId => 400,
            AuthError::MalformedBody(_) => 400,
            AuthError::InsecureTransport => 400,
            AuthError::InvalidToken(_) => 400,
            AuthError::TokenExpired => 401,
            AuthError::RateLimited(_) => 429,
            AuthError::Database(_) => 500,
            AuthError::Internal(_) => 500,
        }
    }
}

#[cfg(feature = "client-sqlite")]
impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

#[cfg(feature = "client-sqlite")]
impl From<r2d2::Error> for AuthError {
    fn from(err: r2d2::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}
