//! HTTP routes for authentication
//!
//! Public endpoints relayed to the SSO service:
//! - POST /auth/register   - Create an account
//! - POST /auth/login      - Authenticate and get a token
//! - GET  /auth/public-key - Token verification key (unauthenticated by design)
//!
//! Request bodies are validated here, at the boundary, before any backend
//! call; backend failures pass through the fixed translation table.

use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use super::{
    cors_preflight, error_response, failure_response, json_response, parse_json_body, BoxBody,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    /// Boundary validation; nothing invalid reaches the SSO service
    fn validate(&self) -> Result<(), String> {
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err("email must be a valid address".into()),
        }

        if self.password.len() < 8 {
            return Err("password must be at least 8 characters".into());
        }

        Ok(())
    }
}

/// POST /auth/register
async fn register(state: &AppState, body: CredentialsRequest) -> Response<BoxBody> {
    match state.identity.register(&body.email, &body.password).await {
        Ok(account) => json_response(StatusCode::CREATED, &account),
        Err(failure) => {
            warn!("SSO register failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// POST /auth/login
async fn login(state: &AppState, body: CredentialsRequest) -> Response<BoxBody> {
    match state.identity.login(&body.email, &body.password).await {
        Ok(session) => json_response(StatusCode::OK, &session),
        Err(failure) => {
            warn!("SSO login failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// GET /auth/public-key
async fn public_key(state: &AppState) -> Response<BoxBody> {
    match state.identity.get_public_key().await {
        Ok(key) => json_response(StatusCode::OK, &key),
        Err(failure) => {
            warn!("SSO public key fetch failed: {}", failure);
            failure_response(failure.to_http())
        }
    }
}

/// Parse and validate a credentials body, then run the handler
async fn with_credentials<F, Fut>(
    req: Request<hyper::body::Incoming>,
    handler: F,
) -> Response<BoxBody>
where
    F: FnOnce(CredentialsRequest) -> Fut,
    Fut: std::future::Future<Output = Response<BoxBody>>,
{
    let body: CredentialsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e))
        }
    };

    if let Err(reason) = body.validate() {
        return error_response(StatusCode::BAD_REQUEST, reason);
    }

    handler(body).await
}

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if it is not an
/// auth route.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/auth") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // Remove query string for matching
    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method.clone(), path.as_str()) {
        (Method::POST, "/auth/register") => {
            with_credentials(req, |body| async move { register(&state, body).await }).await
        }
        (Method::POST, "/auth/login") => {
            with_credentials(req, |body| async move { login(&state, body).await }).await
        }
        (Method::GET, "/auth/public-key") => public_key(&state).await,

        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/public-key") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }

        _ => error_response(StatusCode::NOT_FOUND, "Auth endpoint not found"),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::KeyStore;
    use crate::config::Args;
    use crate::rpc::RpcFailure;
    use crate::services::{
        AccountList, BankAccount, BankingService, IdentityService, NewOperation, Operation,
        OperationList, OperationQuery, PublicKeyResponse, Session, UserAccount,
    };
    use async_trait::async_trait;
    use clap::Parser;
    use http_body_util::BodyExt;

    fn credentials(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    struct NullBanking;

    #[async_trait]
    impl BankingService for NullBanking {
        async fn get_accounts(&self, _: i64) -> Result<AccountList, RpcFailure> {
            unimplemented!()
        }

        async fn get_account_by_id(&self, _: i64, _: i64) -> Result<BankAccount, RpcFailure> {
            unimplemented!()
        }

        async fn get_operations(&self, _: OperationQuery) -> Result<OperationList, RpcFailure> {
            unimplemented!()
        }

        async fn create_operation(&self, _: NewOperation) -> Result<Operation, RpcFailure> {
            unimplemented!()
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    /// SSO stub that rejects registration with a backend failure
    struct RejectingSso {
        failure: RpcFailure,
    }

    #[async_trait]
    impl IdentityService for RejectingSso {
        async fn register(&self, _: &str, _: &str) -> Result<UserAccount, RpcFailure> {
            Err(self.failure.clone())
        }

        async fn login(&self, _: &str, _: &str) -> Result<Session, RpcFailure> {
            Err(self.failure.clone())
        }

        async fn get_public_key(&self) -> Result<PublicKeyResponse, RpcFailure> {
            Err(self.failure.clone())
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    struct AcceptingSso;

    #[async_trait]
    impl IdentityService for AcceptingSso {
        async fn register(&self, email: &str, _: &str) -> Result<UserAccount, RpcFailure> {
            Ok(UserAccount {
                id: 1,
                email: email.to_string(),
            })
        }

        async fn login(&self, _: &str, _: &str) -> Result<Session, RpcFailure> {
            Ok(Session {
                access_token: "signed.jwt.token".into(),
                token_type: "Bearer".into(),
                expires_in: 3600,
            })
        }

        async fn get_public_key(&self) -> Result<PublicKeyResponse, RpcFailure> {
            Ok(PublicKeyResponse {
                public_key: "-----BEGIN PUBLIC KEY-----".into(),
            })
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    fn test_state(identity: Arc<dyn IdentityService>) -> AppState {
        AppState::new(
            Args::parse_from(["teller"]),
            identity,
            Arc::new(NullBanking),
            Arc::new(KeyStore::new()),
        )
    }

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_register_translates_invalid_argument_to_400() {
        let state = test_state(Arc::new(RejectingSso {
            failure: RpcFailure::new(3, "invalid email"),
        }));

        let response = register(&state, credentials("user@example.com", "longenough")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid email");
    }

    #[tokio::test]
    async fn test_register_translates_conflict_to_409() {
        let state = test_state(Arc::new(RejectingSso {
            failure: RpcFailure::new(6, "email already registered"),
        }));

        let response = register(&state, credentials("user@example.com", "longenough")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_passes_account_through() {
        let state = test_state(Arc::new(AcceptingSso));

        let response = register(&state, credentials("user@example.com", "longenough")).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["email"], "user@example.com");
    }

    #[tokio::test]
    async fn test_login_passes_session_through() {
        let state = test_state(Arc::new(AcceptingSso));

        let response = login(&state, credentials("user@example.com", "longenough")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["access_token"], "signed.jwt.token");
        assert_eq!(body["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn test_public_key_passes_through() {
        let state = test_state(Arc::new(AcceptingSso));

        let response = public_key(&state).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["publicKey"], "-----BEGIN PUBLIC KEY-----");
    }

    #[test]
    fn test_accepts_valid_credentials() {
        assert!(credentials("user@example.com", "longenough").validate().is_ok());
    }

    #[test]
    fn test_rejects_malformed_email() {
        assert!(credentials("", "longenough").validate().is_err());
        assert!(credentials("no-at-sign", "longenough").validate().is_err());
        assert!(credentials("@example.com", "longenough").validate().is_err());
        assert!(credentials("user@", "longenough").validate().is_err());
    }

    #[test]
    fn test_rejects_short_password() {
        assert!(credentials("user@example.com", "short").validate().is_err());
        assert!(credentials("user@example.com", "1234567").validate().is_err());
        assert!(credentials("user@example.com", "12345678").validate().is_ok());
    }
}
