//! Teller - HTTP gateway for the banking platform

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teller::{
    auth::{KeyBootstrap, KeyStore},
    config::Args,
    rpc::{RpcClient, RpcConnection},
    server::{self, AppState},
    services::{BankingClient, IdentityClient, IdentityService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("teller={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Teller - Banking Platform Gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("SSO service: {}", args.sso_service_url);
    info!("Banking service: {}", args.banking_service_url);
    info!("Key fetch retries: {}", args.key_fetch_retries);
    info!("Request timeout: {}ms", args.request_timeout_ms);
    info!("======================================");

    let timeout = Duration::from_millis(args.request_timeout_ms);

    // One long-lived connection per backend, opened here and reused for the
    // process lifetime. The connections maintain themselves; individual
    // calls are never retried by the gateway.
    let sso_connection = RpcConnection::open(&args.sso_service_url);
    let banking_connection = RpcConnection::open(&args.banking_service_url);

    let identity = Arc::new(IdentityClient::new(RpcClient::new(
        "sso",
        sso_connection,
        timeout,
    )));
    let banking = Arc::new(BankingClient::new(RpcClient::new(
        "banking",
        banking_connection,
        timeout,
    )));

    let keys = Arc::new(KeyStore::new());

    let state = Arc::new(AppState::new(
        args.clone(),
        Arc::clone(&identity) as Arc<dyn IdentityService>,
        banking,
        Arc::clone(&keys),
    ));

    // Fetch the SSO verification key in the background. Until it lands,
    // protected routes reject with "public key not available"; if the retry
    // budget runs out they stay that way until restart, while public routes
    // keep serving.
    let bootstrap = KeyBootstrap::new(
        identity as Arc<dyn IdentityService>,
        keys,
        args.key_fetch_retries,
    );
    tokio::spawn(async move {
        if let Err(e) = bootstrap.run().await {
            error!("{}. Protected routes unavailable until restart.", e);
        }
    });

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
