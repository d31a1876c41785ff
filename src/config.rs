//! Configuration for Teller
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Teller - HTTP gateway for the banking platform
#[derive(Parser, Debug, Clone)]
#[command(name = "teller")]
#[command(about = "HTTP gateway in front of the SSO and banking RPC services")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// SSO service RPC endpoint (registration, login, public key)
    #[arg(long, env = "SSO_SERVICE_URL", default_value = "ws://localhost:50051")]
    pub sso_service_url: String,

    /// Banking service RPC endpoint (accounts, operations)
    #[arg(long, env = "BANKING_SERVICE_URL", default_value = "ws://localhost:50052")]
    pub banking_service_url: String,

    /// Retry budget for the startup public-key fetch (attempts = retries + 1)
    #[arg(long, env = "KEY_FETCH_RETRIES", default_value = "5")]
    pub key_fetch_retries: u32,

    /// Timeout for a single backend RPC call in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("SSO_SERVICE_URL", &self.sso_service_url),
            ("BANKING_SERVICE_URL", &self.banking_service_url),
        ] {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(format!("{} must be a ws:// or wss:// URL, got '{}'", name, url));
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}
