//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use llm_balance_core::{KeyRules, ProviderEndpoint, ProviderKind};

use crate::upstream::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES};
use crate::upstream::RetryPolicy;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:3000").
    pub listen_addr: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Per-attempt timeout for provider requests, in seconds.
    pub upstream_timeout_seconds: u64,

    /// Backoff policy for provider requests.
    pub retry: RetryPolicy,

    /// Balance cache TTL in seconds (0 disables the cache).
    pub cache_ttl_seconds: u64,

    /// Maximum number of cached balances.
    pub cache_max_entries: usize,

    /// Maximum number of keys in one batch request.
    pub batch_max_keys: usize,

    /// Key shape rules.
    pub key_rules: KeyRules,

    /// `DeepSeek` endpoint.
    pub deepseek: ProviderEndpoint,

    /// `SiliconFlow` endpoint.
    pub siliconflow: ProviderEndpoint,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let retry = RetryPolicy::new(env_or("UPSTREAM_MAX_RETRIES", DEFAULT_MAX_RETRIES))
            .with_base_delay(Duration::from_millis(env_or(
                "UPSTREAM_RETRY_BASE_MS",
                millis(DEFAULT_BASE_DELAY),
            )))
            .with_max_delay(Duration::from_millis(env_or(
                "UPSTREAM_RETRY_MAX_MS",
                millis(DEFAULT_MAX_DELAY),
            )));

        let mut key_rules = KeyRules {
            min_length: env_or("API_KEY_MIN_LENGTH", defaults.key_rules.min_length),
            max_length: env_or("API_KEY_MAX_LENGTH", defaults.key_rules.max_length),
            ..defaults.key_rules
        };
        if let Some(ratio) = env_parse::<f64>("API_KEY_MIN_UNIQUE_RATIO") {
            key_rules = key_rules.with_min_unique_ratio(ratio);
        }

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            upstream_timeout_seconds: env_or(
                "UPSTREAM_TIMEOUT_SECONDS",
                defaults.upstream_timeout_seconds,
            ),
            retry,
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            batch_max_keys: env_or("BATCH_MAX_KEYS", defaults.batch_max_keys),
            key_rules,
            deepseek: endpoint_from_env(ProviderKind::DeepSeek, "DEEPSEEK"),
            siliconflow: endpoint_from_env(ProviderKind::SiliconFlow, "SILICONFLOW"),
        }
    }

    /// Endpoint configuration for a provider.
    #[must_use]
    pub fn endpoint(&self, kind: ProviderKind) -> &ProviderEndpoint {
        match kind {
            ProviderKind::DeepSeek => &self.deepseek,
            ProviderKind::SiliconFlow => &self.siliconflow,
        }
    }

    /// Per-attempt upstream timeout.
    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    /// Overall budget for fetching one key's balance.
    ///
    /// Nine tenths of the request timeout, so a slow provider fails as a
    /// per-key `TIMEOUT` before the request-level timeout fires.
    #[must_use]
    pub fn fetch_deadline(&self) -> Duration {
        Duration::from_millis(self.request_timeout_seconds.saturating_mul(900))
    }

    /// Cache entry lifetime.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Build a provider endpoint from `<PREFIX>_API_URL` and `<PREFIX>_DEFAULT_CURRENCY`.
fn endpoint_from_env(kind: ProviderKind, prefix: &str) -> ProviderEndpoint {
    let mut endpoint = ProviderEndpoint::default_for(kind);
    if let Ok(url) = std::env::var(format!("{prefix}_API_URL")) {
        endpoint = endpoint.with_base_url(url);
    }
    if let Ok(currency) = std::env::var(format!("{prefix}_DEFAULT_CURRENCY")) {
        endpoint = endpoint.with_default_currency(currency);
    }
    endpoint
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_parse(name).unwrap_or(default)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            upstream_timeout_seconds: 15,
            retry: RetryPolicy::default(),
            cache_ttl_seconds: 300,
            cache_max_entries: 1000,
            batch_max_keys: 50,
            key_rules: KeyRules::default(),
            deepseek: ProviderEndpoint::default_for(ProviderKind::DeepSeek),
            siliconflow: ProviderEndpoint::default_for(ProviderKind::SiliconFlow),
        }
    }
}
