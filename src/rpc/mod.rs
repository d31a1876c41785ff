//! Backend RPC layer
//!
//! Each backend (SSO, banking) is reached over one long-lived WebSocket
//! connection carrying MessagePack request/response envelopes. Failures
//! surface as [`RpcFailure`] values; the fixed code table in
//! [`failure`] is the only place that turns them into HTTP statuses.

pub mod connection;
pub mod failure;
pub mod protocol;

pub use connection::RpcConnection;
pub use failure::{HttpFailure, RpcFailure};
pub use protocol::RpcClient;
