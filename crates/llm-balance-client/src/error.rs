//! Client error types.

/// Errors that can occur when using the llm-balance client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code (e.g. `API_KEY_TOO_SHORT`, `UNAUTHORIZED`).
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
        /// Request ID reported by the service.
        request_id: Option<String>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// The service error code, if this is an API error.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the provider rejected the key (401 or 403).
    #[must_use]
    pub fn is_key_rejected(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }

    /// Whether the failure is worth retrying later (408, 429, 502, 503).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api {
                status: 408 | 429 | 502 | 503,
                ..
            }
        )
    }
}
