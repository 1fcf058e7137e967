//! # tgauth - Telegram Login Verification Library
//!
//! Verifies signed login payloads from the Telegram Login Widget / WebApp
//! and issues short-lived, self-verifying session tokens.
//!
//! ## Features
//!
//! - **Payload Verification**: HMAC-SHA256 over the canonical data-check
//!   string, with constant-time comparison and a freshness window bounding
//!   replay exposure
//! - **Session Tokens**: Compact stateless bearer tokens
//!   (`base64url(claims).base64url(signature)`) bound to the same secret
//! - **Transport Adapter**: Framework-agnostic callback handling (GET query,
//!   POST JSON or form), plus an optional axum router
//! - **Known Clients**: Trait-based best-effort persistence with a SQLite
//!   backend
//! - **Rate Limiting**: Optional per-IP lockout for failed attempts
//!
//! ## Quick Start
//!
//! ```rust
//! use tgauth::{LoginVerifier, LoginPayload};
//!
//! let verifier = LoginVerifier::new("123456:your-bot-token");
//!
//! let payload = LoginPayload::from_pairs([
//!     ("id", "1000"),
//!     ("first_name", "Tester"),
//!     ("auth_date", "1700000000"),
//!     ("hash", "hex-from-the-widget"),
//! ]);
//!
//! match verifier.verify(&payload, 1700000030) {
//!     Ok(user) => println!("authenticated: {} ({})", user.first_name, user.id),
//!     Err(e) => eprintln!("rejected with {}: {}", e.http_status_code(), e),
//! }
//! ```
//!
//! ## Full callback pipeline
//!
//! ```rust
//! use tgauth::{AuthGateway, CallbackRequest, LoginVerifier, TokenIssuer};
//!
//! let secret = "123456:your-bot-token";
//! let gateway = AuthGateway::new(LoginVerifier::new(secret), TokenIssuer::new(secret));
//!
//! let response = gateway.handle(&CallbackRequest::get("id=1000&first_name=T&auth_date=0&hash=x"));
//! assert_eq!(response.status, 401);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod signature;
pub mod token;
pub mod transport;
pub mod verifier;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

#[cfg(feature = "axum")]
pub mod router;

// Re-exports for convenience
pub use client::ClientSink;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use payload::{LoginPayload, ResolvedUser, REQUIRED_FIELDS};
pub use token::{IssuedToken, SessionClaims, TokenIssuer};
pub use transport::{AuthGateway, CallbackRequest, CallbackResponse, RequestPayload};
pub use verifier::LoginVerifier;

#[cfg(feature = "client-sqlite")]
pub use client::SqliteClientStore;

#[cfg(feature = "rate-limit")]
pub use rate_limit::{RateLimiter, RateLimiterConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default freshness window for `auth_date` (seconds)
pub const DEFAULT_AUTH_TTL_SECS: i64 = 600;

/// Default session token lifetime (seconds)
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Maximum session token length (prevents DoS via large tokens)
pub const MAX_TOKEN_LENGTH: usize = 2048;

/// Maximum number of fields accepted in a login payload (prevents DoS via
/// canonicalizing and signing huge field sets; real widget payloads carry
/// fewer than ten)
pub const MAX_PAYLOAD_FIELDS: usize = 64;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::client::ClientSink;
    pub use crate::config::AuthConfig;
    pub use crate::error::{AuthError, AuthResult};
    pub use crate::payload::{LoginPayload, ResolvedUser};
    pub use crate::token::{IssuedToken, SessionClaims, TokenIssuer};
    pub use crate::transport::{AuthGateway, CallbackRequest, CallbackResponse};
    pub use crate::verifier::LoginVerifier;

    #[cfg(feature = "client-sqlite")]
    pub use crate::client::SqliteClientStore;

    #[cfg(feature = "rate-limit")]
    pub use crate::rate_limit::{RateLimiter, RateLimiterConfig};
}
