//! Application state.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::BalanceCache;
use crate::config::ServiceConfig;
use crate::upstream::{FetchError, UpstreamClient};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: ServiceConfig,

    /// HTTP client for provider balance endpoints.
    pub upstream: UpstreamClient,

    /// Balance cache.
    pub cache: Arc<BalanceCache>,

    /// When the service started.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: ServiceConfig) -> Result<Self, FetchError> {
        let upstream = UpstreamClient::new(config.upstream_timeout(), config.retry.clone())?
            .with_deadline(config.fetch_deadline());
        let cache = Arc::new(BalanceCache::new(
            config.cache_ttl(),
            config.cache_max_entries,
        ));

        if cache.is_enabled() {
            tracing::info!(
                ttl_seconds = config.cache_ttl_seconds,
                max_entries = config.cache_max_entries,
                "Balance cache enabled"
            );
        } else {
            tracing::warn!("Balance cache disabled - every check hits the provider");
        }

        Ok(Self {
            config,
            upstream,
            cache,
            started_at: Instant::now(),
        })
    }

    /// Seconds since the service started.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
