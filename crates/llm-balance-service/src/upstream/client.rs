//! Upstream balance API client implementation.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use llm_balance_core::{ApiKey, ProviderEndpoint};

use super::retry::RetryPolicy;

/// User agent sent to providers.
const USER_AGENT: &str = concat!("llm-balance/", env!("CARGO_PKG_VERSION"));

/// Upstream error bodies are logged up to this many bytes.
const MAX_LOGGED_BODY_BYTES: usize = 512;

/// Error type for upstream balance requests.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the client timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// The provider rejected the key (401).
    #[error("upstream rejected the API key")]
    Unauthorized,

    /// The provider refused access for this key (403).
    #[error("upstream denied access")]
    Forbidden,

    /// The provider is rate limiting this key (429).
    #[error("upstream rate limit exceeded")]
    RateLimited,

    /// The provider failed (5xx).
    #[error("upstream server error: {status}")]
    Server {
        /// HTTP status code.
        status: u16,
    },

    /// Any other non-success status (e.g. 404 on a retired path).
    #[error("unexpected upstream status: {status}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// Connection, DNS or transport failure.
    #[error("upstream unreachable: {0}")]
    Network(String),

    /// The HTTP client could not be built.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    /// Classify a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            s if s.is_server_error() => Self::Server { status: s.as_u16() },
            s => Self::UnexpectedStatus { status: s.as_u16() },
        }
    }

    /// Classify a transport-level reqwest error.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Whether another attempt may succeed (network failures, 5xx).
    ///
    /// Timeouts are final.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }

    /// Whether the legacy path is worth trying after this failure.
    ///
    /// Auth and rate-limit outcomes are about the key, not the path. A slow
    /// provider stays slow on any path.
    #[must_use]
    pub fn allows_fallback(&self) -> bool {
        !matches!(
            self,
            Self::Timeout
                | Self::Unauthorized
                | Self::Forbidden
                | Self::RateLimited
                | Self::Configuration(_)
        )
    }
}

/// A successful upstream response.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Parsed body; `Value::Null` when the body was not JSON.
    pub payload: Value,
    /// Number of HTTP attempts made against `url`.
    pub attempts: u32,
    /// URL that produced the payload.
    pub url: String,
}

/// HTTP client for provider balance endpoints.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    retry: RetryPolicy,
    deadline: Option<Duration>,
}

impl UpstreamClient {
    /// Create a new upstream client.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Per-attempt request timeout
    /// * `retry` - Backoff policy for transient failures
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            retry,
            deadline: None,
        })
    }

    /// Bound a whole `fetch_balance` call (retries, backoff and fallback
    /// included) by `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The retry policy in use.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The overall fetch deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Fetch the raw balance payload for `key` from `endpoint`.
    ///
    /// Tries the primary path with retries; if that fails with anything other
    /// than an auth, rate-limit or timeout outcome and the provider has a
    /// legacy path, tries that path (with retries) before giving up. Running
    /// past the deadline fails with [`FetchError::Timeout`].
    pub async fn fetch_balance(
        &self,
        endpoint: &ProviderEndpoint,
        key: &ApiKey,
    ) -> Result<FetchOutcome, FetchError> {
        let Some(deadline) = self.deadline else {
            return self.fetch_with_fallback(endpoint, key).await;
        };

        match tokio::time::timeout(deadline, self.fetch_with_fallback(endpoint, key)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    provider = %endpoint.kind,
                    deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                    "Balance fetch exceeded its deadline"
                );
                Err(FetchError::Timeout)
            }
        }
    }

    async fn fetch_with_fallback(
        &self,
        endpoint: &ProviderEndpoint,
        key: &ApiKey,
    ) -> Result<FetchOutcome, FetchError> {
        let primary = endpoint.primary_url();

        let err = match self.get_with_retry(&primary, key).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => err,
        };

        let Some(fallback) = endpoint.fallback_url() else {
            return Err(err);
        };
        if !err.allows_fallback() {
            return Err(err);
        }

        tracing::warn!(
            provider = %endpoint.kind,
            error = %err,
            fallback = %fallback,
            "Primary balance endpoint failed, trying fallback"
        );

        self.get_with_retry(&fallback, key).await
    }

    /// GET `url` with exponential backoff on transient failures.
    ///
    /// 401 and 403 fail immediately. 429 gets at most one backed-off retry
    /// when the policy allows it.
    pub async fn get_with_retry(&self, url: &str, key: &ApiKey) -> Result<FetchOutcome, FetchError> {
        let mut retries = 0;
        let mut rate_limit_retried = false;

        loop {
            let err = match self.get_once(url, key).await {
                Ok(payload) => {
                    return Ok(FetchOutcome {
                        payload,
                        attempts: retries + 1,
                        url: url.to_string(),
                    })
                }
                Err(err) => err,
            };

            let retriable = match err {
                FetchError::RateLimited => {
                    self.retry.retry_rate_limited_once && !rate_limit_retried
                }
                ref e => e.is_transient(),
            };

            if !retriable || retries >= self.retry.max_retries {
                tracing::debug!(
                    url = %url,
                    attempts = retries + 1,
                    error = %err,
                    "Upstream request failed"
                );
                return Err(err);
            }

            if matches!(err, FetchError::RateLimited) {
                rate_limit_retried = true;
            }
            retries += 1;

            let delay = self.retry.delay_for_retry(retries);
            tracing::debug!(
                url = %url,
                retry = retries,
                max_retries = self.retry.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Upstream request failed, retrying"
            );

            tokio::time::sleep(delay).await;
        }
    }

    /// One GET attempt.
    async fn get_once(&self, url: &str, key: &ApiKey) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(key.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::from_transport(&e))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::from_transport(&e))?;

            return Ok(serde_json::from_slice(&body).unwrap_or_else(|e| {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    "Upstream returned a non-JSON body"
                );
                Value::Null
            }));
        }

        // Logged for operators only; never forwarded to callers.
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            url = %url,
            status = status.as_u16(),
            body = %truncate(&body, MAX_LOGGED_BODY_BYTES),
            "Upstream returned an error status"
        );

        Err(FetchError::from_status(status))
    }
}

fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            FetchError::from_status(StatusCode::UNAUTHORIZED),
            FetchError::Unauthorized
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::FORBIDDEN),
            FetchError::Forbidden
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::TOO_MANY_REQUESTS),
            FetchError::RateLimited
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::BAD_GATEWAY),
            FetchError::Server { status: 502 }
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::NOT_FOUND),
            FetchError::UnexpectedStatus { status: 404 }
        ));
    }

    #[test]
    fn only_transient_errors_are_retried() {
        assert!(!FetchError::Timeout.is_transient());
        assert!(FetchError::Network("refused".into()).is_transient());
        assert!(FetchError::Server { status: 500 }.is_transient());
        assert!(!FetchError::Unauthorized.is_transient());
        assert!(!FetchError::Forbidden.is_transient());
        assert!(!FetchError::RateLimited.is_transient());
        assert!(!FetchError::UnexpectedStatus { status: 404 }.is_transient());
    }

    #[test]
    fn auth_failures_skip_fallback() {
        assert!(!FetchError::Unauthorized.allows_fallback());
        assert!(!FetchError::Timeout.allows_fallback());
        assert!(!FetchError::RateLimited.allows_fallback());
        assert!(FetchError::UnexpectedStatus { status: 404 }.allows_fallback());
        assert!(FetchError::Server { status: 503 }.allows_fallback());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("余额不足", 4), "余");
    }

    #[test]
    fn client_creation() {
        let client = UpstreamClient::new(Duration::from_secs(5), RetryPolicy::no_retry()).unwrap();
        assert_eq!(client.retry_policy().max_retries, 0);
        assert!(client.deadline().is_none());

        let client = client.with_deadline(Duration::from_secs(9));
        assert_eq!(client.deadline(), Some(Duration::from_secs(9)));
    }
}
