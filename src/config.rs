//! Environment-driven configuration.
//!
//! The bot token is read from the environment or a mounted secrets file. A
//! missing token is logged loudly but does not abort startup: the callback
//! answers 500 until the operator fixes the deployment.

use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{error, info, warn};

use crate::{DEFAULT_AUTH_TTL_SECS, DEFAULT_TOKEN_LIFETIME_SECS};

/// Recognized configuration for the login callback.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared bot token; `None` means every callback answers 500
    pub bot_token: Option<String>,

    /// Freshness window for `auth_date`, seconds (0 disables)
    pub ttl_seconds: i64,

    /// Session token lifetime, seconds
    pub token_lifetime_seconds: i64,

    /// Whether to reject callbacks arriving over insecure transport
    pub https_only: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            ttl_seconds: DEFAULT_AUTH_TTL_SECS,
            token_lifetime_seconds: DEFAULT_TOKEN_LIFETIME_SECS,
            https_only: true,
        }
    }
}

impl AuthConfig {
    /// Load configuration from the environment.
    ///
    /// `BOT_TOKEN` is taken from the environment variable or, failing that,
    /// from `/run/secrets/BOT_TOKEN`. `AUTH_TTL_SECONDS`,
    /// `SESSION_LIFETIME_SECONDS` and `HTTPS_ONLY` fall back to defaults.
    pub fn from_env() -> Self {
        let bot_token = read_secret("BOT_TOKEN");
        if bot_token.is_none() {
            error!(
                "BOT_TOKEN is not configured; login callbacks will answer 500 until it is set"
            );
        }

        Self {
            bot_token,
            ttl_seconds: try_load("AUTH_TTL_SECONDS", DEFAULT_AUTH_TTL_SECS),
            token_lifetime_seconds: try_load(
                "SESSION_LIFETIME_SECONDS",
                DEFAULT_TOKEN_LIFETIME_SECS,
            ),
            https_only: try_load("HTTPS_ONLY", true),
        }
    }

    /// Set the bot token in code (useful for tests and embedding).
    pub fn with_bot_token(mut self, token: impl Into<String>) -> Self {
        self.bot_token = Some(token.into());
        self
    }
}

fn try_load<T: FromStr + Display + Copy>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("invalid {key} value ({e}), using default: {default}");
                default
            }
        },
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

/// Read a secret from the environment, then from `/run/secrets/<name>`.
fn read_secret(name: &str) -> Option<String> {
    if let Ok(value) = env::var(name) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    let path = format!("/run/secrets/{name}");
    match read_to_string(&path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Err(_) => None,
    }
}
