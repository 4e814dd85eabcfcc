//! Balance check handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use llm_balance_core::{
    mask_key, ApiKey, BatchSummary, NormalizedBalance, Normalizer, ProviderKind,
};

use crate::cache::CacheKey;
use crate::crypto::short_fingerprint;
use crate::error::{ApiError, ApiFailure};
use crate::extract::RequestId;
use crate::state::AppState;

/// Single balance check request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceRequest {
    /// The key to check. Kept untyped so a non-string is reported precisely.
    #[serde(default, alias = "api_key")]
    pub api_key: Option<Value>,
    /// Provider name (default `deepseek`).
    #[serde(default)]
    pub provider: Option<String>,
}

/// Single balance check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBalanceResponse {
    /// Always `true`.
    pub success: bool,
    /// Normalized balance.
    pub data: NormalizedBalance,
    /// Provider that was queried.
    pub provider: ProviderKind,
    /// Whether the result came from the cache.
    pub cached: bool,
    /// Request ID.
    pub request_id: String,
    /// Time spent serving the request.
    pub response_time_ms: u64,
}

/// Batch balance check request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckRequest {
    /// Keys to check, in order.
    #[serde(default, alias = "api_keys")]
    pub api_keys: Option<Vec<Value>>,
    /// Provider name applied to every key (default `deepseek`).
    #[serde(default)]
    pub provider: Option<String>,
}

/// Outcome for one key of a batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// Masked key.
    pub api_key: String,
    /// Whether the check succeeded.
    pub success: bool,
    /// Normalized balance on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NormalizedBalance>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error code on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Whether the result came from the cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl BatchItem {
    fn succeeded(api_key: String, checked: Checked) -> Self {
        Self {
            api_key,
            success: true,
            data: Some(checked.balance),
            error: None,
            code: None,
            cached: Some(checked.cached),
        }
    }

    fn failed(api_key: String, error: &ApiError) -> Self {
        Self {
            api_key,
            success: false,
            data: None,
            error: Some(error.public_message()),
            code: Some(error.code()),
            cached: None,
        }
    }
}

/// Batch balance check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckResponse {
    /// `true` whenever the batch itself was processed.
    pub success: bool,
    /// Request ID.
    pub request_id: String,
    /// Provider that was queried.
    pub provider: ProviderKind,
    /// Aggregate over successful checks.
    pub summary: BatchSummary,
    /// Per-key outcomes, in input order.
    pub details: Vec<BatchItem>,
    /// Time spent serving the request.
    pub response_time_ms: u64,
}

/// Result of checking one key.
#[derive(Debug, Clone)]
pub struct Checked {
    /// Normalized balance.
    pub balance: NormalizedBalance,
    /// Whether it came from the cache.
    pub cached: bool,
}

/// Check the balance of one key.
///
/// POST /api/v1/balance/check
pub async fn check_balance(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    body: Result<Json<CheckBalanceRequest>, JsonRejection>,
) -> Result<Json<CheckBalanceResponse>, ApiFailure> {
    let started = Instant::now();
    let fail = |e: ApiError| e.with_request_id(request_id.as_str());

    let Json(body) = body.map_err(|e| fail(ApiError::BadRequest(e.body_text())))?;

    let key = state
        .config
        .key_rules
        .validate_value(body.api_key.as_ref())
        .map_err(|e| {
            tracing::debug!(request_id = %request_id.as_str(), code = e.code(), "Rejected API key");
            fail(e.into())
        })?;
    let provider = resolve_provider(body.provider.as_deref()).map_err(fail)?;

    let checked = check_one(&state, provider, &key).await.map_err(fail)?;
    let response_time_ms = elapsed_ms(started);

    tracing::info!(
        request_id = %request_id.as_str(),
        provider = %provider,
        key = %key.masked(),
        cached = checked.cached,
        response_time_ms,
        "Balance check completed"
    );

    Ok(Json(CheckBalanceResponse {
        success: true,
        data: checked.balance,
        provider,
        cached: checked.cached,
        request_id: request_id.0,
        response_time_ms,
    }))
}

/// Check the balances of several keys concurrently.
///
/// POST /api/v1/balance/batch
pub async fn check_balance_batch(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    body: Result<Json<BatchCheckRequest>, JsonRejection>,
) -> Result<Json<BatchCheckResponse>, ApiFailure> {
    let started = Instant::now();
    let fail = |e: ApiError| e.with_request_id(request_id.as_str());

    let Json(body) = body.map_err(|e| fail(ApiError::BadRequest(e.body_text())))?;

    let keys = body.api_keys.unwrap_or_default();
    if keys.is_empty() {
        return Err(fail(ApiError::BadRequest(
            "apiKeys must be a non-empty array".into(),
        )));
    }
    let max = state.config.batch_max_keys;
    if keys.len() > max {
        return Err(fail(ApiError::BadRequest(format!(
            "Too many keys: {} > {max}",
            keys.len()
        ))));
    }
    let provider = resolve_provider(body.provider.as_deref()).map_err(fail)?;

    let checks = keys.iter().map(|raw| {
        let state = &state;
        async move {
            let masked = match raw {
                Value::String(s) => mask_key(s),
                _ => "***".to_string(),
            };
            let key = match state.config.key_rules.validate_value(Some(raw)) {
                Ok(key) => key,
                Err(rejection) => return BatchItem::failed(masked, &rejection.into()),
            };
            match check_one(state, provider, &key).await {
                Ok(checked) => BatchItem::succeeded(masked, checked),
                Err(e) => BatchItem::failed(masked, &e),
            }
        }
    });
    let details = join_all(checks).await;

    let summary = BatchSummary::collect(details.iter().map(|item| item.data.as_ref()));
    let response_time_ms = elapsed_ms(started);

    tracing::info!(
        request_id = %request_id.as_str(),
        provider = %provider,
        total = summary.total,
        success = summary.success,
        failure = summary.failure,
        response_time_ms,
        "Batch balance check completed"
    );

    Ok(Json(BatchCheckResponse {
        success: true,
        request_id: request_id.0,
        provider,
        summary,
        details,
        response_time_ms,
    }))
}

/// Cache lookup, then fetch and normalize on a miss.
pub async fn check_one(
    state: &AppState,
    provider: ProviderKind,
    key: &ApiKey,
) -> Result<Checked, ApiError> {
    let cache_key = CacheKey::new(provider, key);
    if let Some(balance) = state.cache.get(&cache_key).await {
        tracing::debug!(
            provider = %provider,
            fingerprint = %short_fingerprint(key),
            "Balance cache hit"
        );
        return Ok(Checked {
            balance,
            cached: true,
        });
    }

    let endpoint = state.config.endpoint(provider);
    let outcome = state
        .upstream
        .fetch_balance(endpoint, key)
        .await
        .map_err(|e| {
            tracing::warn!(
                provider = %provider,
                key = %key.masked(),
                error = %e,
                "Balance fetch failed"
            );
            ApiError::from(e)
        })?;

    tracing::debug!(
        provider = %provider,
        url = %outcome.url,
        attempts = outcome.attempts,
        "Balance fetched"
    );

    let balance = Normalizer::new(endpoint.default_currency.clone()).normalize(&outcome.payload);
    state.cache.insert(cache_key, balance.clone()).await;

    Ok(Checked {
        balance,
        cached: false,
    })
}

fn resolve_provider(raw: Option<&str>) -> Result<ProviderKind, ApiError> {
    match raw {
        None => Ok(ProviderKind::default()),
        Some(name) => Ok(name.parse()?),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_to_deepseek() {
        assert_eq!(resolve_provider(None).unwrap(), ProviderKind::DeepSeek);
        assert_eq!(
            resolve_provider(Some("SiliconFlow")).unwrap(),
            ProviderKind::SiliconFlow
        );
        assert_eq!(
            resolve_provider(Some("openai")).unwrap_err().code(),
            "UNKNOWN_PROVIDER"
        );
    }

    #[test]
    fn request_accepts_snake_case_alias() {
        let body: CheckBalanceRequest =
            serde_json::from_str(r#"{"api_key": "sk-x", "provider": "deepseek"}"#).unwrap();
        assert_eq!(body.api_key, Some(Value::from("sk-x")));
    }

    #[test]
    fn failed_item_omits_data() {
        let item = BatchItem::failed("sk-...".into(), &ApiError::UpstreamUnauthorized);
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert!(json.get("data").is_none());
        assert!(json.get("cached").is_none());
    }
}
