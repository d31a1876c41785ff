//! Authentication for Teller
//!
//! Provides:
//! - RS256 bearer token verification against the SSO public key
//! - The startup key fetch with bounded retry
//! - The per-request gate for protected routes

pub mod bootstrap;
pub mod guard;
pub mod token;

pub use bootstrap::KeyBootstrap;
pub use guard::{AuthGuard, AuthRejection, KeyStore, VerificationKey};
pub use token::{extract_bearer_token, Claims, TokenVerifier};
