//! Axum bindings for the login callback.
//!
//! A thin shell over [`AuthGateway`]: it snapshots the HTTP request into a
//! [`CallbackRequest`] and renders the gateway's response as JSON. No
//! signature logic lives here.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};

use crate::transport::{AuthGateway, CallbackRequest};

/// Build a router exposing `ANY /auth/callback`.
pub fn router(gateway: Arc<AuthGateway>) -> Router {
    Router::new()
        .route("/auth/callback", any(callback_handler))
        .with_state(gateway)
}

async fn callback_handler(
    State(gateway): State<Arc<AuthGateway>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = CallbackRequest {
        method: method.as_str().to_string(),
        secure: is_secure(&uri, &headers),
        content_type: header_str(&headers, header::CONTENT_TYPE.as_str()),
        query: uri.query().map(str::to_string),
        body: body.to_vec(),
        peer: forwarded_peer(&headers),
    };

    let outcome = gateway.handle(&request);
    let status =
        StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome.body)).into_response()
}

/// Effective scheme: the request URI itself, or the proxy's
/// `x-forwarded-proto` when terminating TLS upstream.
fn is_secure(uri: &Uri, headers: &HeaderMap) -> bool {
    if uri.scheme_str() == Some("https") {
        return true;
    }
    header_str(headers, "x-forwarded-proto")
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

/// Peer address as reported by the reverse proxy (first `x-forwarded-for`
/// entry). Absent or unparseable entries yield `None`.
fn forwarded_peer(headers: &HeaderMap) -> Option<std::net::IpAddr> {
    header_str(headers, "x-forwarded-for")?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
