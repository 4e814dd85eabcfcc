//! Request and response types for the llm-balance API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use llm_balance_core::{BatchSummary, NormalizedBalance, ProviderKind};

// ============================================================================
// Balance Check
// ============================================================================

/// Single balance check request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceRequest {
    /// Provider API key to check.
    pub api_key: String,
    /// Provider to query.
    pub provider: ProviderKind,
}

/// Single balance check response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Normalized balance.
    pub data: NormalizedBalance,
    /// Provider that was queried.
    pub provider: ProviderKind,
    /// Whether the service answered from its cache.
    pub cached: bool,
    /// Request ID.
    pub request_id: String,
    /// Server-side time spent on the request.
    pub response_time_ms: u64,
}

// ============================================================================
// Batch Check
// ============================================================================

/// Batch balance check request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckRequest {
    /// Provider API keys to check.
    pub api_keys: Vec<String>,
    /// Provider to query for every key.
    pub provider: ProviderKind,
}

/// Outcome for one key of a batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// Masked key.
    pub api_key: String,
    /// Whether the check succeeded.
    pub success: bool,
    /// Normalized balance on success.
    #[serde(default)]
    pub data: Option<NormalizedBalance>,
    /// Error message on failure.
    #[serde(default)]
    pub error: Option<String>,
    /// Error code on failure.
    #[serde(default)]
    pub code: Option<String>,
    /// Whether the service answered from its cache.
    #[serde(default)]
    pub cached: Option<bool>,
}

/// Batch balance check response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckResponse {
    /// Whether the batch was processed.
    pub success: bool,
    /// Request ID.
    pub request_id: String,
    /// Provider that was queried.
    pub provider: ProviderKind,
    /// Aggregate over successful checks.
    pub summary: BatchSummary,
    /// Per-key outcomes in request order.
    pub details: Vec<BatchItem>,
    /// Server-side time spent on the request.
    pub response_time_ms: u64,
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code.
    pub code: String,
    /// Request ID, when the service attached one.
    #[serde(default)]
    pub request_id: Option<String>,
}
