//! # Authentication Module
//!
//! Optional API key check for the intake server.
//!
//! - `INTAKE_API_KEY`: when set, every route except `/health` needs
//!   `Authorization: Bearer <key>` (a bare key is accepted too).

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Routes reachable without a key.
const PUBLIC_PATHS: [&str; 1] = ["/health"];

/// `INTAKE_API_KEY`, if set and non-empty.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("INTAKE_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Constant-time key comparison. Both sides are zero-padded to the same
/// length so the comparison time does not depend on where they differ.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    let len = provided.len().max(expected.len());

    let mut left = vec![0u8; len];
    let mut right = vec![0u8; len];
    left[..provided.len()].copy_from_slice(provided);
    right[..expected.len()].copy_from_slice(expected);

    let same: bool = left.ct_eq(&right).into();
    same && provided.len() == expected.len()
}

fn unauthorized(reason: &'static str) -> (StatusCode, &'static str) {
    tracing::warn!(event = "auth_failure", reason, "Request rejected");
    (StatusCode::UNAUTHORIZED, "Unauthorized")
}

pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match provided {
        Some(key) if keys_match(key, &expected) => Ok(next.run(request).await),
        Some(_) => Err(unauthorized("invalid_api_key")),
        None => Err(unauthorized("missing_authorization_header")),
    }
}
