//! Core types and utilities for llm-balance.
//!
//! This crate provides the pure, I/O-free pieces of the balance checker:
//!
//! - **Providers**: `ProviderKind`, `ProviderEndpoint`
//! - **Keys**: `KeyRules`, `ApiKey`, `KeyRejection`
//! - **Balances**: `NormalizedBalance`, `BatchSummary`
//! - **Normalization**: `Normalizer`, `BalanceField`, `parse_expire_time`
//!
//! # Normalization
//!
//! Providers return balance payloads in several shapes. The normalizer probes
//! `balance_infos[0]`, then `data`, then the top level, and returns the first
//! candidate that carries a non-zero figure. It never fails: unknown shapes
//! produce a zero-filled record in the provider's default currency.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod balance;
pub mod error;
pub mod key;
pub mod normalize;
pub mod provider;

pub use balance::{BatchSummary, NormalizedBalance};
pub use error::{KeyRejection, UnknownProvider};
pub use key::{
    mask_key, validate, ApiKey, KeyRules, DEFAULT_KEY_PREFIX, DEFAULT_MAX_KEY_LENGTH,
    DEFAULT_MIN_KEY_LENGTH,
};
pub use normalize::{normalize, parse_expire_time, BalanceField, Normalizer, FIELD_ALIASES};
pub use provider::{ProviderEndpoint, ProviderKind, DEFAULT_CURRENCY};
