//! RPC envelope protocol
//!
//! Both backends speak the same scheme: MessagePack request/response
//! envelopes over the persistent connection. A request carries an id, a
//! method name, and method params; the response echoes the id and carries
//! either a result or a failure.
//!
//! Transport problems (timeout, dropped link, undecodable frames) become
//! [`RpcFailure`] values with codes outside the mapped table, so they
//! translate to 500 like any other unrecognized failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::connection::RpcConnection;
use super::failure::RpcFailure;

#[derive(Debug, Serialize)]
struct RequestEnvelope<'a, P> {
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "R: serde::de::DeserializeOwned"))]
struct ResponseEnvelope<R> {
    id: u64,
    #[serde(default)]
    result: Option<R>,
    #[serde(default)]
    error: Option<RpcFailure>,
}

/// Typed call interface over one backend connection
pub struct RpcClient {
    /// Backend name for logs ("sso", "banking")
    name: &'static str,
    connection: RpcConnection,
    next_id: AtomicU64,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(name: &'static str, connection: RpcConnection, timeout: Duration) -> Self {
        Self {
            name,
            connection,
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    /// Call a backend method and decode its result.
    ///
    /// One attempt only: failed calls surface to the caller, they are never
    /// retried here.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, RpcFailure>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let payload = rmp_serde::to_vec_named(&RequestEnvelope { id, method, params })
            .map_err(|e| RpcFailure::unavailable(format!("failed to encode {} request: {}", method, e)))?;

        debug!("[{}] -> {} (id {}, {} bytes)", self.name, method, id, payload.len());

        let raw = match tokio::time::timeout(self.timeout, self.connection.request(payload)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("[{}] {} failed: {}", self.name, method, e);
                return Err(RpcFailure::unavailable(e.to_string()));
            }
            Err(_) => {
                warn!("[{}] {} timed out after {:?}", self.name, method, self.timeout);
                return Err(RpcFailure::deadline_exceeded(format!(
                    "{} request timed out",
                    method
                )));
            }
        };

        let response: ResponseEnvelope<R> = rmp_serde::from_slice(&raw)
            .map_err(|e| RpcFailure::unavailable(format!("malformed {} response: {}", method, e)))?;

        if response.id != id {
            warn!(
                "[{}] response id {} does not match request id {}",
                self.name, response.id, id
            );
            return Err(RpcFailure::unavailable("response stream out of sync"));
        }

        if let Some(failure) = response.error {
            debug!("[{}] {} returned failure code {}", self.name, method, failure.code);
            return Err(failure);
        }

        response
            .result
            .ok_or_else(|| RpcFailure::unavailable(format!("{} response carried no result", method)))
    }

    /// Whether the underlying link is currently up
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Params<'a> {
        email: &'a str,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        id: i64,
        email: String,
    }

    #[test]
    fn test_request_envelope_encodes_by_field_name() {
        let payload = rmp_serde::to_vec_named(&RequestEnvelope {
            id: 7,
            method: "register",
            params: Params { email: "a@b.io" },
        })
        .unwrap();

        // Decode as a generic map to confirm named fields are on the wire
        let decoded: serde_json::Value = rmp_serde::from_slice(&payload).unwrap();
        assert_eq!(decoded["id"], 7);
        assert_eq!(decoded["method"], "register");
        assert_eq!(decoded["params"]["email"], "a@b.io");
    }

    #[test]
    fn test_response_envelope_with_result() {
        let raw = rmp_serde::to_vec_named(&serde_json::json!({
            "id": 7,
            "result": { "id": 1, "email": "a@b.io" },
        }))
        .unwrap();

        let envelope: ResponseEnvelope<Reply> = rmp_serde::from_slice(&raw).unwrap();
        assert_eq!(envelope.id, 7);
        assert!(envelope.error.is_none());
        assert_eq!(
            envelope.result.unwrap(),
            Reply {
                id: 1,
                email: "a@b.io".into()
            }
        );
    }

    #[test]
    fn test_response_envelope_with_failure() {
        let raw = rmp_serde::to_vec_named(&serde_json::json!({
            "id": 9,
            "error": { "code": 6, "message": "already exists", "details": "email taken" },
        }))
        .unwrap();

        let envelope: ResponseEnvelope<Reply> = rmp_serde::from_slice(&raw).unwrap();
        assert_eq!(envelope.id, 9);
        assert!(envelope.result.is_none());

        let failure = envelope.error.unwrap();
        assert_eq!(failure.code, 6);
        assert_eq!(failure.message, "already exists");
        assert_eq!(failure.details.as_deref(), Some("email taken"));
    }
}
