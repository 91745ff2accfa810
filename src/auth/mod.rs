//! Admin-key authentication for write routes.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, AppErrorWithRevision};

/// Header name for the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Admin-key layer; `expected_key` of `None` lets every request through.
pub async fn admin_key_layer(
    expected_key: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // No key configured means the whole roster is editable (dev mode)
    let Some(expected) = expected_key else {
        return next.run(request).await;
    };

    let verdict = provided_key(&request).map(|key| keys_match(key, &expected));
    match verdict {
        Some(true) => next.run(request).await,
        Some(false) => unauthorized_response("Invalid admin key"),
        None => unauthorized_response("Admin access required"),
    }
}

/// Key sent in `x-admin-key`, or else as an `Authorization: Bearer` token.
fn provided_key(request: &Request) -> Option<&str> {
    let headers = request.headers();
    headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

/// Constant-time key comparison.
fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    tracing::debug!("Rejected write: {}", message);
    AppErrorWithRevision {
        error: AppError::Unauthorized(message.to_string()),
        revision_id: 0,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/api/members");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match("admin-key-123", "admin-key-123"));
        assert!(!keys_match("admin-key-123", "admin-key-124"));
        assert!(!keys_match("short", "much-longer-key"));
        assert!(keys_match("", ""));
        assert!(!keys_match("", "not-empty"));
    }

    #[test]
    fn test_provided_key_prefers_admin_header() {
        let req = request(&[
            (ADMIN_KEY_HEADER, "from-header"),
            ("authorization", "Bearer from-bearer"),
        ]);
        assert_eq!(provided_key(&req), Some("from-header"));
    }

    #[test]
    fn test_provided_key_falls_back_to_bearer() {
        assert_eq!(
            provided_key(&request(&[("authorization", "Bearer secret")])),
            Some("secret")
        );
        assert_eq!(provided_key(&request(&[("authorization", "Basic abc")])), None);
        assert_eq!(provided_key(&request(&[])), None);
    }
}
