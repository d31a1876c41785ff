//! Identity (SSO) service port and adapter
//!
//! The SSO service owns registration, login, and the signing keys for the
//! tokens it issues. The gateway only relays credentials and fetches the
//! public verification key; it never sees or issues tokens itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rpc::{RpcClient, RpcFailure};

/// A registered user, as returned by the SSO service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
}

/// An issued session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// The SSO service's public verification key (PEM)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Identity service operations the gateway relies on
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<UserAccount, RpcFailure>;

    async fn login(&self, email: &str, password: &str) -> Result<Session, RpcFailure>;

    async fn get_public_key(&self) -> Result<PublicKeyResponse, RpcFailure>;

    /// Whether the backend link is currently up (health reporting only)
    async fn is_connected(&self) -> bool;
}

/// Binds [`IdentityService`] to the live SSO connection
pub struct IdentityClient {
    rpc: RpcClient,
}

impl IdentityClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl IdentityService for IdentityClient {
    async fn register(&self, email: &str, password: &str) -> Result<UserAccount, RpcFailure> {
        self.rpc.call("register", Credentials { email, password }).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, RpcFailure> {
        self.rpc.call("login", Credentials { email, password }).await
    }

    async fn get_public_key(&self) -> Result<PublicKeyResponse, RpcFailure> {
        self.rpc.call("get_public_key", ()).await
    }

    async fn is_connected(&self) -> bool {
        self.rpc.is_connected().await
    }
}
