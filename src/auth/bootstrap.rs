//! Startup fetch of the SSO verification key
//!
//! The gateway cannot authenticate any protected request until it holds the
//! SSO service's public key. [`KeyBootstrap`] fetches it once at startup,
//! tolerating transient SSO unavailability with a sequential
//! exponential-backoff retry loop: waits of 1s, 2s, 4s, ... between
//! attempts, one attempt in flight at a time. Exhausting the budget is
//! fatal to protected routes (they keep rejecting with "public key not
//! available" until restart); unauthenticated routes are unaffected.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::guard::{KeyStore, VerificationKey};
use crate::services::IdentityService;
use crate::types::{GatewayError, Result};

pub struct KeyBootstrap {
    identity: Arc<dyn IdentityService>,
    keys: Arc<KeyStore>,
    max_retries: u32,
}

impl KeyBootstrap {
    pub fn new(identity: Arc<dyn IdentityService>, keys: Arc<KeyStore>, max_retries: u32) -> Self {
        Self {
            identity,
            keys,
            max_retries,
        }
    }

    /// Fetch the key, publish it to the [`KeyStore`], and return it.
    ///
    /// Performs up to `1 + max_retries` attempts. This is the only writer
    /// of the key store.
    pub async fn run(&self) -> Result<Arc<VerificationKey>> {
        let attempts = self.max_retries + 1;
        let mut attempt = 0u32;

        loop {
            match self.fetch().await {
                Ok(key) => {
                    info!(
                        "Public key fetched from SSO (attempt {}/{})",
                        attempt + 1,
                        attempts
                    );
                    let key = Arc::new(key);
                    self.keys.publish(Arc::clone(&key)).await;
                    return Ok(key);
                }
                Err(e) if attempt >= self.max_retries => {
                    error!(
                        "Failed to fetch public key after {} retries: {}",
                        self.max_retries, e
                    );
                    return Err(GatewayError::Bootstrap(format!(
                        "could not fetch public key from SSO: {}",
                        e
                    )));
                }
                Err(e) => {
                    let wait = Duration::from_secs(2u64.saturating_pow(attempt));
                    warn!(
                        "Failed to fetch public key (attempt {}/{}): {}. Retrying in {}s...",
                        attempt + 1,
                        attempts,
                        e,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One fetch attempt. A key that fails to parse counts as a failure.
    async fn fetch(&self) -> std::result::Result<VerificationKey, String> {
        let response = self
            .identity
            .get_public_key()
            .await
            .map_err(|e| e.to_string())?;

        VerificationKey::from_pem(response.public_key)
            .map_err(|e| format!("SSO returned an unusable key: {}", e))
    }
}
