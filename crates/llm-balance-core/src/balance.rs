//! Normalized balance records.

use serde::{Deserialize, Serialize};

/// The fixed-shape balance every provider payload is mapped into.
///
/// Numeric fields are always finite; anything missing or unparseable in the
/// source payload becomes `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBalance {
    /// Spendable balance.
    pub balance: f64,
    /// Currency code (e.g. `CNY`, `USD`).
    pub currency: String,
    /// Total granted credit.
    pub total_granted: f64,
    /// Total used credit.
    pub total_used: f64,
    /// Expiry as an ISO-8601 UTC timestamp, if the provider reported one.
    pub expire_time: Option<String>,
}

impl NormalizedBalance {
    /// Zero-filled record in the given currency.
    #[must_use]
    pub fn zeroed(currency: impl Into<String>) -> Self {
        Self {
            balance: 0.0,
            currency: currency.into(),
            total_granted: 0.0,
            total_used: 0.0,
            expire_time: None,
        }
    }

    /// Whether any figure is strictly positive.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.balance > 0.0 || self.total_granted > 0.0 || self.total_used > 0.0
    }

    /// Used credit as a percentage of granted credit, clamped to `0..=100`.
    #[must_use]
    pub fn usage_percent(&self) -> f64 {
        usage_percent(self.total_used, self.total_granted)
    }
}

fn usage_percent(used: f64, granted: f64) -> f64 {
    if granted <= 0.0 {
        return 0.0;
    }
    (used / granted * 100.0).clamp(0.0, 100.0)
}

/// Aggregate over a batch of balance checks.
///
/// Totals are summed over successful checks only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Number of keys in the batch.
    pub total: usize,
    /// Number of successful checks.
    pub success: usize,
    /// Number of failed checks.
    pub failure: usize,
    /// Sum of balances.
    pub total_balance: f64,
    /// Sum of granted credit.
    pub total_granted: f64,
    /// Sum of used credit.
    pub total_used: f64,
    /// `total_used / total_granted` as a percentage.
    pub usage_percent: f64,
}

impl BatchSummary {
    /// Build a summary from per-key outcomes (`None` marks a failure).
    pub fn collect<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a NormalizedBalance>>,
    {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.total += 1;
            match outcome {
                Some(balance) => {
                    summary.success += 1;
                    summary.total_balance = saturating_add(summary.total_balance, balance.balance);
                    summary.total_granted =
                        saturating_add(summary.total_granted, balance.total_granted);
                    summary.total_used = saturating_add(summary.total_used, balance.total_used);
                }
                None => summary.failure += 1,
            }
        }
        summary.usage_percent = usage_percent(summary.total_used, summary.total_granted);
        summary
    }
}

/// Add two finite figures, clamping to `±f64::MAX` instead of overflowing.
fn saturating_add(a: f64, b: f64) -> f64 {
    (a + b).clamp(-f64::MAX, f64::MAX)
}
