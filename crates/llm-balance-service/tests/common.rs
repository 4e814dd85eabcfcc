//! Common test utilities for llm-balance integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use llm_balance_core::{KeyRules, ProviderEndpoint, ProviderKind};
use llm_balance_service::{create_router, AppState, RetryPolicy, ServiceConfig};

/// A key that passes validation.
pub const VALID_KEY: &str = "sk-validapikey1234567890";

/// A second valid key.
pub const OTHER_KEY: &str = "sk-anotherapikey0987654321";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Mock standing in for both providers.
    pub upstream: MockServer,
}

impl TestHarness {
    /// Create a harness with fast retries and caching enabled.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a harness, letting the caller adjust the configuration.
    pub async fn with_config(customize: impl FnOnce(&mut ServiceConfig)) -> Self {
        let upstream = MockServer::start().await;

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            upstream_timeout_seconds: 5,
            retry: RetryPolicy::new(2)
                .with_base_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(40)),
            cache_ttl_seconds: 300,
            cache_max_entries: 100,
            batch_max_keys: 5,
            key_rules: KeyRules::default(),
            deepseek: ProviderEndpoint::default_for(ProviderKind::DeepSeek)
                .with_base_url(upstream.uri()),
            siliconflow: ProviderEndpoint::default_for(ProviderKind::SiliconFlow)
                .with_base_url(upstream.uri()),
        };
        customize(&mut config);

        let state = AppState::new(config).expect("Failed to build state");
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, upstream }
    }

    /// Answer the `DeepSeek` balance endpoint for `key` with `body`.
    pub async fn mock_deepseek(&self, key: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path("/v1/user/balance"))
            .and(header("authorization", format!("Bearer {key}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.upstream)
            .await;
    }

    /// Answer the `DeepSeek` balance endpoint for `key` with a bare status.
    pub async fn mock_deepseek_status(&self, key: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/v1/user/balance"))
            .and(header("authorization", format!("Bearer {key}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&self.upstream)
            .await;
    }

    /// Number of requests the mock provider received.
    pub async fn upstream_requests(&self) -> usize {
        self.upstream
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

/// A `DeepSeek`-shaped balance payload.
pub fn deepseek_payload(total: &str, granted: &str, topped_up: &str) -> Value {
    json!({
        "is_available": true,
        "balance_infos": [{
            "currency": "CNY",
            "total_balance": total,
            "granted_balance": granted,
            "topped_up_balance": topped_up
        }]
    })
}
