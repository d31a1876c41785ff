//! Teller - HTTP gateway for the banking platform
//!
//! Teller sits between browser clients and two backend RPC services: the
//! SSO service (registration, login, token signing keys) and the banking
//! service (accounts, operations).
//!
//! ## Responsibilities
//!
//! - **Key bootstrap**: fetch the SSO token verification key at startup,
//!   with bounded exponential-backoff retry
//! - **Authentication**: verify RS256 bearer tokens on every protected route
//! - **Relay**: forward validated requests over long-lived RPC connections
//! - **Error translation**: map backend RPC failure codes to HTTP statuses

pub mod auth;
pub mod config;
pub mod routes;
pub mod rpc;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
