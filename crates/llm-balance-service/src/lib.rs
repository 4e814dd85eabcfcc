//! LLM Balance HTTP API Service.
//!
//! This crate provides the HTTP API for checking LLM provider account
//! balances, including:
//!
//! - API key validation
//! - Upstream balance fetches with retry, backoff and legacy-path fallback
//! - Normalization of provider payloads into one balance shape
//! - A TTL cache of normalized balances
//! - Batch checks over many keys
//!
//! # Providers
//!
//! `DeepSeek` and `SiliconFlow` are supported. Base URLs and default
//! currencies are configurable per provider.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handlers need async for consistency

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod upstream;

pub use cache::{BalanceCache, CacheKey, CacheStats};
pub use config::ServiceConfig;
pub use error::{ApiError, ApiFailure};
pub use routes::create_router;
pub use state::AppState;
pub use upstream::{FetchError, FetchOutcome, RetryPolicy, UpstreamClient};
