//! LLM Balance HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use llm_balance_core::ProviderKind;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BatchCheckRequest, BatchCheckResponse, CheckBalanceRequest,
    CheckBalanceResponse, HealthResponse,
};

/// LLM Balance API client.
///
/// Provides methods for checking provider balances through the service.
#[derive(Debug, Clone)]
pub struct BalanceClient {
    client: Client,
    base_url: String,
}

impl BalanceClient {
    /// Create a new llm-balance client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the llm-balance service (e.g., `"http://llm-balance:3000"`)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new llm-balance client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with default settings).
    #[must_use]
    pub fn with_options(base_url: impl Into<String>, options: ClientOptions) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Check the balance of one provider API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn check(
        &self,
        api_key: impl Into<String>,
        provider: ProviderKind,
    ) -> Result<CheckBalanceResponse, ClientError> {
        let url = format!("{}/api/v1/balance/check", self.base_url);
        let request = CheckBalanceRequest {
            api_key: api_key.into(),
            provider,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// Check the balances of several keys in one request.
    ///
    /// Per-key failures are reported in the response details, not as errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects the batch
    /// as a whole (empty, too large, unknown provider).
    pub async fn check_batch<I, S>(
        &self,
        api_keys: I,
        provider: ProviderKind,
    ) -> Result<BatchCheckResponse, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let url = format!("{}/api/v1/balance/batch", self.base_url);
        let request = BatchCheckRequest {
            api_keys: api_keys.into_iter().map(Into::into).collect(),
            provider,
        };

        if request.api_keys.is_empty() {
            return Err(ClientError::Configuration(
                "batch requires at least one key".into(),
            ));
        }

        let response = self.client.post(&url).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// Query the service health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/api/v1/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                tracing::debug!(
                    status = status.as_u16(),
                    code = %api_error.code,
                    request_id = ?api_error.request_id,
                    "llm-balance returned an error"
                );
                Err(ClientError::Api {
                    code: api_error.code,
                    message: api_error.error,
                    status: status.as_u16(),
                    request_id: api_error.request_id,
                })
            }
            Err(_) => Err(ClientError::Api {
                code: "UNKNOWN".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
                request_id: None,
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    ///
    /// Should exceed the service's request timeout.
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl ClientOptions {
    /// Create options with a request timeout.
    #[must_use]
    pub fn with_timeout_seconds(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }
}
