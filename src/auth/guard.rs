//! Request authentication gate
//!
//! Every protected route passes through [`AuthGuard::authenticate`] before
//! its handler runs. The guard is stateless across requests; the only
//! shared state is the [`KeyStore`], written once by the key bootstrap and
//! read here on every request.

use chrono::{DateTime, Utc};
use hyper::header::AUTHORIZATION;
use hyper::HeaderMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::token::{extract_bearer_token, Claims, TokenVerifier};

/// The SSO verification key, as obtained at bootstrap.
/// Immutable once built; replacing it means publishing a new value.
pub struct VerificationKey {
    pub pem: String,
    pub fetched_at: DateTime<Utc>,
    verifier: TokenVerifier,
}

impl VerificationKey {
    /// Parse a PEM-encoded RSA public key into a ready-to-use key
    pub fn from_pem(pem: String) -> Result<Self, jsonwebtoken::errors::Error> {
        let verifier = TokenVerifier::from_rsa_pem(&pem)?;
        Ok(Self {
            pem,
            fetched_at: Utc::now(),
            verifier,
        })
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }
}

/// Shared holder for the verification key.
///
/// Single writer (the key bootstrap), many readers (one per in-flight
/// request). Holds at most one key; a re-bootstrap swaps the Arc whole.
#[derive(Default)]
pub struct KeyStore {
    key: RwLock<Option<Arc<VerificationKey>>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a key, replacing any previous one
    pub async fn publish(&self, key: Arc<VerificationKey>) {
        *self.key.write().await = Some(key);
    }

    pub async fn get(&self) -> Option<Arc<VerificationKey>> {
        self.key.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.key.read().await.is_some()
    }
}

/// Why a request was turned away at the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer <token>` header
    MissingToken,
    /// The key bootstrap has not published a key yet (or gave up)
    KeyUnavailable,
    /// Signature, expiry, or decode failure; the cause is deliberately
    /// not distinguished in the response
    InvalidToken,
}

impl AuthRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingToken => "no token provided",
            Self::KeyUnavailable => "public key not available",
            Self::InvalidToken => "invalid or expired token",
        }
    }
}

impl fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Bearer-token gate for protected routes
#[derive(Clone)]
pub struct AuthGuard {
    keys: Arc<KeyStore>,
}

impl AuthGuard {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    /// Authenticate a request from its headers.
    ///
    /// Requests arriving before a key is published are rejected rather than
    /// queued; the gateway never accepts a token it cannot verify.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthRejection> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let token = extract_bearer_token(header).ok_or(AuthRejection::MissingToken)?;

        let key = self.keys.get().await.ok_or(AuthRejection::KeyUnavailable)?;

        key.verifier().verify(token).map_err(|e| {
            debug!("Token verification failed: {}", e);
            AuthRejection::InvalidToken
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::{
        now_secs, sign_token, OTHER_PRIVATE_PEM, TEST_PRIVATE_PEM, TEST_PUBLIC_PEM,
    };
    use hyper::header::HeaderValue;

    async fn guard_with_key() -> AuthGuard {
        let keys = Arc::new(KeyStore::new());
        let guard = AuthGuard::new(Arc::clone(&keys));
        let key = VerificationKey::from_pem(TEST_PUBLIC_PEM.to_string()).unwrap();
        keys.publish(Arc::new(key)).await;
        guard
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_rejects_missing_header() {
        let guard = guard_with_key().await;
        let result = guard.authenticate(&HeaderMap::new()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::MissingToken);
        assert_eq!(AuthRejection::MissingToken.reason(), "no token provided");
    }

    #[tokio::test]
    async fn test_rejects_non_bearer_scheme() {
        let guard = guard_with_key().await;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));

        let result = guard.authenticate(&headers).await;
        assert_eq!(result.unwrap_err(), AuthRejection::MissingToken);
    }

    #[tokio::test]
    async fn test_rejects_before_key_is_published() {
        // Even a token the future key would accept is rejected
        let guard = AuthGuard::new(Arc::new(KeyStore::new()));
        let token = sign_token(
            TEST_PRIVATE_PEM,
            &serde_json::json!({ "sub": "42", "exp": now_secs() + 3600 }),
        );

        let result = guard.authenticate(&bearer_headers(&token)).await;
        assert_eq!(result.unwrap_err(), AuthRejection::KeyUnavailable);
        assert_eq!(
            AuthRejection::KeyUnavailable.reason(),
            "public key not available"
        );
    }

    #[tokio::test]
    async fn test_rejects_token_from_wrong_key() {
        let guard = guard_with_key().await;
        let token = sign_token(
            OTHER_PRIVATE_PEM,
            &serde_json::json!({ "sub": "42", "exp": now_secs() + 3600 }),
        );

        let result = guard.authenticate(&bearer_headers(&token)).await;
        assert_eq!(result.unwrap_err(), AuthRejection::InvalidToken);
        assert_eq!(
            AuthRejection::InvalidToken.reason(),
            "invalid or expired token"
        );
    }

    #[tokio::test]
    async fn test_rejects_expired_token() {
        let guard = guard_with_key().await;
        let token = sign_token(
            TEST_PRIVATE_PEM,
            &serde_json::json!({ "sub": "42", "exp": now_secs() - 3600 }),
        );

        let result = guard.authenticate(&bearer_headers(&token)).await;
        assert_eq!(result.unwrap_err(), AuthRejection::InvalidToken);
    }

    #[tokio::test]
    async fn test_accepts_valid_token() {
        let guard = guard_with_key().await;
        let token = sign_token(
            TEST_PRIVATE_PEM,
            &serde_json::json!({ "sub": "42", "exp": now_secs() + 3600, "iss": "sso" }),
        );

        let claims = guard.authenticate(&bearer_headers(&token)).await.unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id(), Some(42));
    }

    #[tokio::test]
    async fn test_key_replacement_swaps_atomically() {
        let keys = Arc::new(KeyStore::new());
        let first = Arc::new(VerificationKey::from_pem(TEST_PUBLIC_PEM.to_string()).unwrap());
        keys.publish(Arc::clone(&first)).await;

        let second = Arc::new(VerificationKey::from_pem(TEST_PUBLIC_PEM.to_string()).unwrap());
        keys.publish(Arc::clone(&second)).await;

        let current = keys.get().await.unwrap();
        assert!(Arc::ptr_eq(&current, &second));
    }
}
