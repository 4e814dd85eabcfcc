//! Upstream provider definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownProvider;

/// Currency used when neither the payload nor the provider names one.
pub const DEFAULT_CURRENCY: &str = "CNY";

/// A supported balance provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// `DeepSeek` (`api.deepseek.com`).
    #[default]
    DeepSeek,

    /// `SiliconFlow` (`api.siliconflow.cn`).
    SiliconFlow,
}

impl ProviderKind {
    /// All supported providers.
    pub const ALL: [Self; 2] = [Self::DeepSeek, Self::SiliconFlow];

    /// Get the provider name as used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::SiliconFlow => "siliconflow",
        }
    }

    /// Human-readable provider name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::DeepSeek => "DeepSeek",
            Self::SiliconFlow => "SiliconFlow",
        }
    }

    /// Public API base URL.
    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com",
            Self::SiliconFlow => "https://api.siliconflow.cn",
        }
    }

    /// Path of the balance endpoint.
    #[must_use]
    pub const fn balance_path(&self) -> &'static str {
        match self {
            Self::DeepSeek => "/v1/user/balance",
            Self::SiliconFlow => "/v1/user/info",
        }
    }

    /// Legacy path tried when the primary path fails outright.
    #[must_use]
    pub const fn fallback_path(&self) -> Option<&'static str> {
        match self {
            Self::DeepSeek => Some("/user/balance"),
            Self::SiliconFlow => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "siliconflow" => Ok(Self::SiliconFlow),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Where and how to query one provider's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    /// Which provider this endpoint belongs to.
    pub kind: ProviderKind,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Path of the primary balance endpoint.
    pub balance_path: String,
    /// Optional legacy path.
    pub fallback_path: Option<String>,
    /// Currency reported when the payload does not carry one.
    pub default_currency: String,
}

impl ProviderEndpoint {
    /// Endpoint with the provider's public defaults.
    #[must_use]
    pub fn default_for(kind: ProviderKind) -> Self {
        Self {
            kind,
            base_url: kind.default_base_url().to_string(),
            balance_path: kind.balance_path().to_string(),
            fallback_path: kind.fallback_path().map(String::from),
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Override the base URL (used for self-hosted gateways and tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the fallback currency.
    #[must_use]
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Full URL of the primary balance endpoint.
    #[must_use]
    pub fn primary_url(&self) -> String {
        format!("{}{}", self.base_url, self.balance_path)
    }

    /// Full URL of the legacy endpoint, if the provider has one.
    #[must_use]
    pub fn fallback_url(&self) -> Option<String> {
        self.fallback_path
            .as_ref()
            .map(|path| format!("{}{path}", self.base_url))
    }
}
