//! Upstream provider integration.
//!
//! The fetcher issues one authenticated GET per attempt against a provider's
//! balance endpoint, retries transient failures with capped exponential
//! backoff, and falls back to the provider's legacy path when the primary
//! path fails outright.

pub mod client;
pub mod retry;

pub use client::{FetchError, FetchOutcome, UpstreamClient};
pub use retry::RetryPolicy;
