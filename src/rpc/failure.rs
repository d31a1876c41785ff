//! RPC failure codes and their HTTP translation
//!
//! Backends report failures as a small integer code plus free text. The
//! mapping to HTTP statuses is total: every code outside the known set,
//! including codes invented after this table was written, falls through to
//! 500. Nothing else in the gateway may pick a status for an RPC failure.

use hyper::StatusCode;
use serde::{Deserialize, Serialize};

/// Fallback body text when a failure carries no usable message
const GENERIC_MESSAGE: &str = "internal server error";

/// A failure surfaced by a backend RPC call
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("rpc failure (code {code}): {message}")]
pub struct RpcFailure {
    /// Status code from the backend's failure vocabulary
    pub code: i32,
    /// Free-text summary
    pub message: String,
    /// Optional detail text, preferred over `message` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RpcFailure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Transport-level timeout; the code is outside the mapped set on purpose
    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    /// Transport-level failure (connection down, codec error); unmapped code
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(14, message)
    }

    /// Translate to the HTTP-facing failure via the fixed table
    pub fn to_http(&self) -> HttpFailure {
        let status = match self.code {
            3 => StatusCode::BAD_REQUEST,         // invalid argument
            5 => StatusCode::NOT_FOUND,           // not found
            6 => StatusCode::CONFLICT,            // already exists
            7 => StatusCode::FORBIDDEN,           // permission denied
            16 => StatusCode::UNAUTHORIZED,       // unauthenticated
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        HttpFailure {
            status,
            message: self.client_message().to_string(),
        }
    }

    /// Detail text if present, else the message, else a generic fallback.
    /// Never empty.
    fn client_message(&self) -> &str {
        match self.details.as_deref() {
            Some(details) if !details.is_empty() => details,
            _ if !self.message.is_empty() => &self.message,
            _ => GENERIC_MESSAGE,
        }
    }
}

/// The failure a client ultimately sees: an HTTP status plus a message.
/// Produced only here and by the authentication gate's rejections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: StatusCode,
    pub message: String,
}

impl HttpFailure {
    /// Authentication-stage rejection; always 401
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: reason.into(),
        }
    }
}
