//! LLM Balance Client SDK.
//!
//! This crate provides a client library for calling the llm-balance API.
//!
//! # Example
//!
//! ```no_run
//! use llm_balance_client::{BalanceClient, ProviderKind};
//!
//! # async fn example() -> Result<(), llm_balance_client::ClientError> {
//! let client = BalanceClient::new("http://llm-balance:3000");
//!
//! let response = client
//!     .check("sk-your-provider-api-key", ProviderKind::DeepSeek)
//!     .await?;
//!
//! println!(
//!     "Balance: {} {} (cached: {})",
//!     response.data.balance, response.data.currency, response.cached
//! );
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{BalanceClient, ClientOptions};
pub use error::ClientError;
pub use llm_balance_core::{BatchSummary, NormalizedBalance, ProviderKind};
pub use types::*;
