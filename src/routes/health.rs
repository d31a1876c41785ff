//! Health check endpoints
//!
//! - /health, /healthz - liveness probe (is the gateway running?)
//! - /ready, /readyz   - readiness probe (can it serve protected traffic?)
//! - /version          - build info for deployment verification
//!
//! Liveness always returns 200 while the process runs. Readiness requires
//! the verification key to be published and both backend links to be up;
//! before that, protected requests would only ever be rejected.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if the gateway is running)
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Current timestamp
    pub timestamp: String,
    /// Node identifier
    pub node_id: String,
    /// Authentication readiness
    pub auth: AuthHealth,
    /// Backend connection status
    pub backends: BackendsHealth,
}

#[derive(Serialize)]
pub struct AuthHealth {
    /// Whether the SSO verification key has been published
    pub key_loaded: bool,
}

#[derive(Serialize)]
pub struct BackendsHealth {
    pub sso: BackendHealth,
    pub banking: BackendHealth,
}

#[derive(Serialize)]
pub struct BackendHealth {
    pub connected: bool,
}

async fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        node_id: state.args.node_id.to_string(),
        auth: AuthHealth {
            key_loaded: state.keys.is_ready().await,
        },
        backends: BackendsHealth {
            sso: BackendHealth {
                connected: state.identity.is_connected().await,
            },
            banking: BackendHealth {
                connected: state.banking.is_connected().await,
            },
        },
    }
}

fn render(status: StatusCode, response: &HealthResponse) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Handle liveness probe (/health, /healthz)
pub async fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state).await;
    render(StatusCode::OK, &response)
}

/// Handle readiness probe (/ready, /readyz)
pub async fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = build_health_response(&state).await;

    let is_ready = response.auth.key_loaded
        && response.backends.sso.connected
        && response.backends.banking.connected;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    render(status, &response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "teller",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
