//! Periodic purge of expired session token rows.
//!
//! Rows that fell out of both lifetime windows no longer authenticate
//! anything; deleting them keeps the token table and its indices small.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::TokenError;
use crate::repositories::TokenRepository;

use super::clock::Clock;
use super::config::TokenServiceConfig;

/// Configuration for the token cleanup service
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600, // Run every hour
            enabled: true,
        }
    }
}

/// Service deleting session token rows past their lifetime windows.
pub struct TokenCleanupService<R, K> {
    repository: Arc<R>,
    clock: K,
    config: TokenCleanupConfig,
    token_config: TokenServiceConfig,
}

impl<R, K> TokenCleanupService<R, K>
where
    R: TokenRepository + 'static,
    K: Clock + 'static,
{
    pub fn new(
        repository: Arc<R>,
        clock: K,
        config: TokenCleanupConfig,
        token_config: TokenServiceConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            config,
            token_config,
        }
    }

    /// Run a single cleanup cycle.
    ///
    /// # Returns
    /// * `Ok(u64)` - Number of expired token rows deleted
    /// * `Err(TokenError)` - If the purge fails
    pub async fn run_cleanup(&self) -> Result<u64, TokenError> {
        let now = self.clock.unix_now();
        let deleted = self
            .repository
            .delete_expired(
                now - self.token_config.max_lifetime,
                now - self.token_config.max_inactive_lifetime,
            )
            .await?;

        info!(deleted, "expired session tokens purged");
        Ok(deleted)
    }

    /// Start the cleanup service as a background task.
    ///
    /// Spawns a tokio task that runs cleanup at regular intervals.
    pub fn start_background_task(self: Arc<Self>) {
        if !self.config.enabled {
            warn!("token cleanup service is disabled");
            return;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds);

        tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval_seconds,
                "token cleanup service started"
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                if let Err(e) = self.run_cleanup().await {
                    error!(error = %e, "token cleanup cycle failed");
                }
            }
        });
    }
}
