//! Framework-agnostic transport adapter.
//!
//! [`AuthGateway`] bridges the verifier and token issuer to a
//! request/response cycle without depending on any particular web framework.
//! The callback accepts GET (query string) and POST (JSON or form body); the
//! payload shape is resolved once into a [`RequestPayload`] variant, then
//! handed to the verifier as a plain field mapping.
//!
//! The gateway contains no signature logic itself; it only sequences the
//! pipeline: transport security, rate limit, payload extraction,
//! verification, best-effort client persistence, token issuance.

use std::net::IpAddr;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, warn};

use crate::client::ClientSink;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::payload::{LoginPayload, ResolvedUser};
use crate::token::{IssuedToken, TokenIssuer};
use crate::verifier::LoginVerifier;
use crate::MAX_PAYLOAD_FIELDS;

#[cfg(feature = "rate-limit")]
use crate::rate_limit::RateLimiter;

/// Snapshot of an inbound callback request, detached from any framework.
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    /// HTTP method (`GET` or `POST`)
    pub method: String,

    /// Whether the effective scheme is secure transport (after any
    /// forwarding headers are resolved by the caller)
    pub secure: bool,

    /// `content-type` header, if present
    pub content_type: Option<String>,

    /// Raw query string, without the leading `?`
    pub query: Option<String>,

    /// Raw request body
    pub body: Vec<u8>,

    /// Peer address, when the caller knows it (used for rate limiting)
    pub peer: Option<IpAddr>,
}

impl CallbackRequest {
    /// A secure GET callback with the given query string.
    pub fn get(query: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            secure: true,
            content_type: None,
            query: Some(query.into()),
            body: Vec::new(),
            peer: None,
        }
    }

    /// A secure POST callback with a JSON body.
    pub fn post_json(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            secure: true,
            content_type: Some("application/json".to_string()),
            query: None,
            body: body.into(),
            peer: None,
        }
    }

    /// A secure POST callback with a form-encoded body.
    pub fn post_form(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            secure: true,
            content_type: Some("application/x-www-form-urlencoded".to_string()),
            query: None,
            body: body.into(),
            peer: None,
        }
    }

    /// Mark the request as arriving over an insecure scheme.
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    /// Attach the peer address.
    pub fn with_peer(mut self, peer: IpAddr) -> Self {
        self.peer = Some(peer);
        self
    }
}

/// Where the login fields came from, resolved once at the transport
/// boundary. Each variant decodes to the same plain [`LoginPayload`].
#[derive(Debug, Clone)]
pub enum RequestPayload {
    /// GET: URL query string
    Query(String),
    /// POST with `application/json`
    Json(Vec<u8>),
    /// POST with `application/x-www-form-urlencoded`
    Form(Vec<u8>),
}

impl RequestPayload {
    /// Classify a request into a payload source.
    pub fn from_request(req: &CallbackRequest) -> AuthResult<Self> {
        if req.method.eq_ignore_ascii_case("GET") {
            return Ok(Self::Query(req.query.clone().unwrap_or_default()));
        }
        if !req.method.eq_ignore_ascii_case("POST") {
            return Err(AuthError::MalformedBody(format!(
                "unsupported method: {}",
                req.method
            )));
        }

        // Parameters like `; charset=utf-8` are ignored for classification.
        let mime = req
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();

        match mime.as_str() {
            "application/json" => Ok(Self::Json(req.body.clone())),
            "application/x-www-form-urlencoded" => Ok(Self::Form(req.body.clone())),
            "" => Err(AuthError::MalformedBody("missing content-type".to_string())),
            other => Err(AuthError::MalformedBody(format!(
                "unsupported content-type: {other}"
            ))),
        }
    }

    /// Decode the source into a plain field mapping.
    ///
    /// JSON scalars (numbers, booleans) are coerced to their string form so
    /// that WebApp-style bodies with numeric `id`/`auth_date` verify against
    /// the same canonical string as query-string logins. Nested values are
    /// rejected; the signing scheme is flat. Payloads with more than
    /// [`MAX_PAYLOAD_FIELDS`] fields are rejected before anything is
    /// canonicalized or signed.
    pub fn decode(&self) -> AuthResult<LoginPayload> {
        match self {
            Self::Query(query) => {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
                    .map_err(|e| AuthError::MalformedBody(format!("bad query string: {e}")))?;
                check_field_count(pairs.len())?;
                Ok(LoginPayload::from_pairs(pairs))
            }
            Self::Form(body) => {
                let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
                    .map_err(|e| AuthError::MalformedBody(format!("bad form body: {e}")))?;
                check_field_count(pairs.len())?;
                Ok(LoginPayload::from_pairs(pairs))
            }
            Self::Json(body) => {
                let map: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_slice(body)
                        .map_err(|e| AuthError::MalformedBody(format!("bad json body: {e}")))?;
                check_field_count(map.len())?;

                let mut payload = LoginPayload::new();
                for (key, value) in map {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Number(n) => n.to_string(),
                        serde_json::Value::Bool(b) => b.to_string(),
                        serde_json::Value::Null => continue,
                        _ => {
                            return Err(AuthError::MalformedBody(format!(
                                "field {key} is not a scalar"
                            )))
                        }
                    };
                    payload.insert(key, text);
                }
                Ok(payload)
            }
        }
    }
}

fn check_field_count(count: usize) -> AuthResult<()> {
    if count > MAX_PAYLOAD_FIELDS {
        return Err(AuthError::MalformedBody(format!(
            "too many fields: {count}"
        )));
    }
    Ok(())
}

/// Response the transport hands back to its HTTP shell.
#[derive(Debug, Clone)]
pub struct CallbackResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl CallbackResponse {
    fn success(user: &ResolvedUser, issued: &IssuedToken) -> Self {
        Self {
            status: 200,
            body: json!({
                "user": user,
                "token": issued.token,
                "expires_in": issued.expires_in,
            }),
        }
    }

    fn rejection(err: &AuthError) -> Self {
        Self {
            status: err.http_status_code(),
            body: json!({ "error": err.to_string() }),
        }
    }
}

/// Orchestrates the login callback: verify the payload, mint a session
/// token, answer `{user, token, expires_in}`.
pub struct AuthGateway {
    verifier: LoginVerifier,
    issuer: TokenIssuer,
    https_only: bool,
    sink: Option<Arc<dyn ClientSink>>,
    #[cfg(feature = "rate-limit")]
    limiter: Option<RateLimiter>,
}

impl AuthGateway {
    /// Create a gateway from a verifier and issuer. HTTPS is enforced by
    /// default.
    pub fn new(verifier: LoginVerifier, issuer: TokenIssuer) -> Self {
        Self {
            verifier,
            issuer,
            https_only: true,
            sink: None,
            #[cfg(feature = "rate-limit")]
            limiter: None,
        }
    }

    /// Create a gateway from loaded configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        let verifier =
            LoginVerifier::from_secret(config.bot_token.as_deref()).with_ttl(config.ttl_seconds);
        // Same secret as the verifier, by design: one trust root.
        let issuer = match config.bot_token.as_deref() {
            Some(secret) => TokenIssuer::new(secret),
            None => TokenIssuer::new(""),
        }
        .with_lifetime(config.token_lifetime_seconds);

        Self::new(verifier, issuer).with_https_only(config.https_only)
    }

    /// Toggle HTTPS enforcement (escape hatch for local development).
    pub fn with_https_only(mut self, enforce: bool) -> Self {
        self.https_only = enforce;
        self
    }

    /// Attach a best-effort known-clients sink, invoked after successful
    /// verification. Sink failures never fail the request.
    pub fn with_client_sink(mut self, sink: Arc<dyn ClientSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach a per-IP rate limiter for failed attempts.
    #[cfg(feature = "rate-limit")]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Handle a callback against the real clock.
    pub fn handle(&self, req: &CallbackRequest) -> CallbackResponse {
        self.handle_at(req, chrono::Utc::now().timestamp())
    }

    /// Handle a callback at an explicit clock `now` (unix seconds).
    ///
    /// Never returns an error: every failure becomes a
    /// `{status, {"error": reason}}` response.
    pub fn handle_at(&self, req: &CallbackRequest, now: i64) -> CallbackResponse {
        match self.authenticate(req, now) {
            Ok((user, issued)) => {
                #[cfg(feature = "rate-limit")]
                if let (Some(limiter), Some(peer)) = (&self.limiter, req.peer) {
                    limiter.record_success(&peer);
                }
                CallbackResponse::success(&user, &issued)
            }
            Err(err) => {
                if matches!(err, AuthError::MissingSecret) {
                    error!("login callback received but no bot token is configured");
                }
                #[cfg(feature = "rate-limit")]
                if err.is_security_event() {
                    if let (Some(limiter), Some(peer)) = (&self.limiter, req.peer) {
                        limiter.record_failure(&peer);
                    }
                }
                CallbackResponse::rejection(&err)
            }
        }
    }

    fn authenticate(
        &self,
        req: &CallbackRequest,
        now: i64,
    ) -> AuthResult<(ResolvedUser, IssuedToken)> {
        if self.https_only && !req.secure {
            return Err(AuthError::InsecureTransport);
        }

        #[cfg(feature = "rate-limit")]
        if let (Some(limiter), Some(peer)) = (&self.limiter, req.peer) {
            limiter.check(&peer)?;
        }

        let payload = RequestPayload::from_request(req)?.decode()?;
        let user = self.verifier.verify(&payload, now)?;

        if let Some(sink) = &self.sink {
            // Best effort: an unavailable store must not fail an otherwise
            // successful authentication.
            if let Err(e) = sink.upsert(&user, now) {
                warn!(user_id = user.id, error = %e, "known-clients upsert failed");
            }
        }

        let issued = self.issuer.issue(user.id, now)?;
        Ok((user, issued))
    }
}
