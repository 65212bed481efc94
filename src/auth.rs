//! Static shared-secret gate in front of the API.
//!
//! Accepts `Authorization: Bearer <token>` as well as a bare `<token>`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized - Missing authentication token")]
    Missing,
    #[error("Unauthorized - Invalid authentication token")]
    Invalid,
}

impl AuthError {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Invalid => "invalid",
        }
    }
}

/// The configured API secret, held only as its SHA-256 digest.
#[derive(Clone)]
pub struct ApiToken {
    digest: Vec<u8>,
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl ApiToken {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).to_vec(),
        }
    }

    /// Short hex prefix of the digest, safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.digest[..4])
    }

    /// Checks a raw `Authorization` header value.
    pub fn verify(&self, header: Option<&str>) -> Result<(), AuthError> {
        let header = match header {
            Some(value) if !value.is_empty() => value,
            _ => return Err(AuthError::Missing),
        };

        let token = extract_token(header);
        if token.is_empty() {
            return Err(AuthError::Invalid);
        }

        let presented = Sha256::digest(token.as_bytes());
        if presented.as_slice() != self.digest.as_slice() {
            return Err(AuthError::Invalid);
        }

        Ok(())
    }
}

/// Strips a leading `Bearer ` if present; otherwise the whole value is the token.
pub fn extract_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header)
}

/// Rejects the request with 401 before it reaches any handler.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let result = match request.headers().get(header::AUTHORIZATION) {
        None => state.token.verify(None),
        Some(value) => match value.to_str() {
            Ok(value) => state.token.verify(Some(value)),
            Err(_) => Err(AuthError::Invalid),
        },
    };

    if let Err(err) = result {
        debug!(reason = err.reason(), "Rejected request");
        metrics::counter!("beacon_auth_rejections_total", "reason" => err.reason()).increment(1);
        return Err(ApiError::Unauthorized(err));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_formats() {
        assert_eq!(extract_token("Bearer abc"), "abc");
        assert_eq!(extract_token("abc"), "abc");
        assert_eq!(extract_token("Bearer "), "");
        // Only the exact prefix is stripped.
        assert_eq!(extract_token("bearer abc"), "bearer abc");
    }

    #[test]
    fn test_valid_token() {
        let token = ApiToken::new("my-secret-token");

        assert_eq!(token.verify(Some("Bearer my-secret-token")), Ok(()));
        assert_eq!(token.verify(Some("my-secret-token")), Ok(()));
    }

    #[test]
    fn test_missing_header() {
        let token = ApiToken::new("my-secret-token");

        assert_eq!(token.verify(None), Err(AuthError::Missing));
        assert_eq!(token.verify(Some("")), Err(AuthError::Missing));
    }

    #[test]
    fn test_invalid_token() {
        let token = ApiToken::new("my-secret-token");

        assert_eq!(token.verify(Some("Bearer wrong")), Err(AuthError::Invalid));
        assert_eq!(token.verify(Some("Bearer ")), Err(AuthError::Invalid));
        assert_eq!(token.verify(Some("Bearer my-secret-token ")), Err(AuthError::Invalid));
        assert_eq!(token.verify(Some("Basic my-secret-token")), Err(AuthError::Invalid));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let token = ApiToken::new("my-secret-token");

        let rendered = format!("{token:?}");
        assert!(!rendered.contains("my-secret-token"));
        assert!(rendered.contains(&token.fingerprint()));
        assert_eq!(token.fingerprint().len(), 8);
    }
}
