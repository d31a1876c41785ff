//! Shared types for Teller

pub mod error;

pub use error::{GatewayError, Result};
