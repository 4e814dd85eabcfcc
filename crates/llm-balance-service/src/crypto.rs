//! Hashing utilities for API keys.
//!
//! Raw keys are never stored. The result cache and the logs refer to a key
//! only through its SHA-256 fingerprint.

use sha2::{Digest, Sha256};

use llm_balance_core::ApiKey;

/// Number of hex characters shown when a fingerprint is logged.
const SHORT_FINGERPRINT_LEN: usize = 16;

/// Compute SHA-256 and return the hex-encoded digest (64 characters).
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)
}

/// Full fingerprint of a validated key, used as the cache key.
#[must_use]
pub fn key_fingerprint(key: &ApiKey) -> String {
    sha256_hex(key.as_str())
}

/// Shortened fingerprint for log lines.
#[must_use]
pub fn short_fingerprint(key: &ApiKey) -> String {
    let mut fingerprint = key_fingerprint(key);
    fingerprint.truncate(SHORT_FINGERPRINT_LEN);
    fingerprint
}
