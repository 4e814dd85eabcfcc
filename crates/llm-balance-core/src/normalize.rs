//! Balance payload normalization.
//!
//! Providers (and different API versions of the same provider) put their
//! figures in different places and under different names. The normalizer
//! tries a fixed list of candidate objects and reads each logical field
//! through an ordered alias list.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::balance::NormalizedBalance;
use crate::provider::DEFAULT_CURRENCY;

/// Timestamps above this are milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Timestamps above this (and not above [`MILLIS_THRESHOLD`]) are seconds.
const SECONDS_THRESHOLD: f64 = 1e9;

/// A logical field of [`NormalizedBalance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceField {
    /// Spendable balance.
    Balance,
    /// Granted credit.
    TotalGranted,
    /// Used credit.
    TotalUsed,
    /// Currency code.
    Currency,
    /// Expiry time.
    ExpireTime,
}

/// Source field names for each logical field, highest priority first.
pub const FIELD_ALIASES: &[(BalanceField, &[&str])] = &[
    (
        BalanceField::Balance,
        &["total_balance", "balance", "available_balance", "totalBalance"],
    ),
    (
        BalanceField::TotalGranted,
        &["total_grant", "grant_balance", "total_granted", "granted_balance"],
    ),
    (BalanceField::TotalUsed, &["total_used", "used_balance"]),
    (
        BalanceField::Currency,
        &["currency", "currency_code", "currency_type"],
    ),
    (BalanceField::ExpireTime, &["expire_time", "expires_at"]),
];

impl BalanceField {
    /// Aliases for this field, highest priority first.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or_default()
    }
}

/// Where a candidate balance object is looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    /// `raw.balance_infos[0]`
    BalanceInfos,
    /// `raw.data`
    DataField,
    /// `raw` itself
    TopLevel,
}

impl Candidate {
    const ORDER: [Self; 3] = [Self::BalanceInfos, Self::DataField, Self::TopLevel];

    fn locate(self, raw: &Value) -> Option<&Map<String, Value>> {
        match self {
            Self::BalanceInfos => raw
                .get("balance_infos")
                .and_then(Value::as_array)
                .and_then(|infos| infos.first())
                .and_then(Value::as_object),
            Self::DataField => raw.get("data").and_then(Value::as_object),
            Self::TopLevel => raw.as_object(),
        }
    }
}

/// Maps raw provider payloads into [`NormalizedBalance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    default_currency: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY)
    }
}

impl Normalizer {
    /// Create a normalizer with the given fallback currency.
    #[must_use]
    pub fn new(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
        }
    }

    /// The fallback currency.
    #[must_use]
    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// Normalize a raw payload.
    ///
    /// Returns the first candidate whose balance, granted or used figure is
    /// strictly positive. A payload where every candidate is all-zero (or
    /// that is not an object at all) yields the zero-filled default, so an
    /// empty account and an unrecognised shape look the same.
    #[must_use]
    pub fn normalize(&self, raw: &Value) -> NormalizedBalance {
        Candidate::ORDER
            .into_iter()
            .filter_map(|candidate| candidate.locate(raw))
            .map(|object| self.extract(object))
            .find(NormalizedBalance::has_signal)
            .unwrap_or_else(|| NormalizedBalance::zeroed(self.default_currency.as_str()))
    }

    /// Read every field of one candidate object.
    #[must_use]
    pub fn extract(&self, object: &Map<String, Value>) -> NormalizedBalance {
        NormalizedBalance {
            balance: number_field(object, BalanceField::Balance),
            currency: currency_field(object)
                .unwrap_or_else(|| self.default_currency.clone()),
            total_granted: number_field(object, BalanceField::TotalGranted),
            total_used: number_field(object, BalanceField::TotalUsed),
            expire_time: BalanceField::ExpireTime
                .aliases()
                .iter()
                .filter_map(|alias| object.get(*alias))
                .find_map(parse_expire_time),
        }
    }
}

/// Normalize with the default currency.
#[must_use]
pub fn normalize(raw: &Value) -> NormalizedBalance {
    Normalizer::default().normalize(raw)
}

fn number_field(object: &Map<String, Value>, field: BalanceField) -> f64 {
    field
        .aliases()
        .iter()
        .filter_map(|alias| object.get(*alias))
        .find_map(coerce_number)
        .unwrap_or(0.0)
}

fn currency_field(object: &Map<String, Value>) -> Option<String> {
    BalanceField::Currency
        .aliases()
        .iter()
        .filter_map(|alias| object.get(*alias))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// Numbers and numeric strings; everything else (and non-finite values) is absent.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Parse an expiry value into an ISO-8601 UTC string.
///
/// Accepts RFC 3339 / ISO-8601 strings, and numeric timestamps (or numeric
/// strings) in seconds or milliseconds, told apart by magnitude. Anything
/// else yields `None`.
#[must_use]
pub fn parse_expire_time(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            parse_iso(s).or_else(|| s.parse::<f64>().ok().and_then(from_timestamp))
        }
        Value::Number(n) => n.as_f64().and_then(from_timestamp),
        _ => None,
    }
}

fn parse_iso(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(format_utc(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| format_utc(naive.and_utc()))
}

fn from_timestamp(ts: f64) -> Option<String> {
    if !ts.is_finite() {
        return None;
    }
    let millis = if ts > MILLIS_THRESHOLD {
        ts
    } else if ts > SECONDS_THRESHOLD {
        ts * 1000.0
    } else {
        return None;
    };
    #[allow(clippy::cast_possible_truncation)]
    let millis = millis.round() as i64;
    DateTime::<Utc>::from_timestamp_millis(millis).map(format_utc)
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_top_level_payload() {
        let result = normalize(&json!({
            "total_balance": 100.5,
            "currency": "CNY",
            "total_grant": 200,
            "total_used": 99.5
        }));

        assert_eq!(result.balance, 100.5);
        assert_eq!(result.currency, "CNY");
        assert_eq!(result.total_granted, 200.0);
        assert_eq!(result.total_used, 99.5);
        assert!(result.expire_time.is_none());
    }

    #[test]
    fn normalizes_balance_infos_array() {
        let result = normalize(&json!({
            "balance_infos": [{
                "total_balance": 150,
                "currency": "CNY",
                "grant_balance": 300,
                "used_balance": 150
            }]
        }));

        assert_eq!(result.balance, 150.0);
        assert_eq!(result.currency, "CNY");
        assert_eq!(result.total_granted, 300.0);
        assert_eq!(result.total_used, 150.0);
    }

    #[test]
    fn normalizes_deepseek_string_figures() {
        let result = normalize(&json!({
            "is_available": true,
            "balance_infos": [{
                "currency": "USD",
                "total_balance": "110.00",
                "granted_balance": "10.00",
                "topped_up_balance": "100.00"
            }]
        }));

        assert_eq!(result.balance, 110.0);
        assert_eq!(result.currency, "USD");
        assert_eq!(result.total_granted, 10.0);
        assert_eq!(result.total_used, 0.0);
    }

    #[test]
    fn normalizes_siliconflow_data_field() {
        let result = normalize(&json!({
            "code": 0,
            "msg": "success",
            "data": {
                "balance": "100.00",
                "total_granted": "120.00",
                "total_used": "20.00"
            }
        }));

        assert_eq!(result.balance, 100.0);
        assert_eq!(result.total_granted, 120.0);
        assert_eq!(result.total_used, 20.0);
        assert_eq!(result.currency, "CNY");
    }

    #[test]
    fn empty_object_yields_zero_default() {
        let result = normalize(&json!({}));
        assert_eq!(result, NormalizedBalance::zeroed("CNY"));
    }

    #[test]
    fn non_object_payloads_yield_zero_default() {
        for raw in [json!(null), json!("oops"), json!([1, 2, 3]), json!(42)] {
            assert_eq!(normalize(&raw), NormalizedBalance::zeroed("CNY"));
        }
    }

    #[test]
    fn default_currency_is_configurable() {
        let normalizer = Normalizer::new("USD");
        assert_eq!(normalizer.normalize(&json!({})).currency, "USD");
        assert_eq!(
            normalizer.normalize(&json!({"balance": 1})).currency,
            "USD"
        );
    }

    #[test]
    fn all_zero_candidate_falls_through_to_next() {
        let result = normalize(&json!({
            "balance_infos": [{"total_balance": 0, "currency": "USD"}],
            "data": {"balance": 42, "currency": "CNY"}
        }));
        assert_eq!(result.balance, 42.0);
        assert_eq!(result.currency, "CNY");
    }

    #[test]
    fn all_zero_everywhere_discards_currency() {
        let result = normalize(&json!({
            "balance_infos": [{"total_balance": "0.00", "currency": "USD"}]
        }));
        assert_eq!(result, NormalizedBalance::zeroed("CNY"));
    }

    #[test]
    fn empty_balance_infos_is_skipped() {
        let result = normalize(&json!({"balance_infos": [], "balance": 7}));
        assert_eq!(result.balance, 7.0);
    }

    #[test]
    fn non_object_data_is_skipped() {
        let result = normalize(&json!({"data": "nope", "available_balance": "3.5"}));
        assert_eq!(result.balance, 3.5);
    }

    #[test]
    fn alias_priority_is_respected() {
        let result = normalize(&json!({
            "balance": 1,
            "total_balance": 2,
            "available_balance": 3
        }));
        assert_eq!(result.balance, 2.0);
    }

    #[test]
    fn unparseable_alias_defers_to_next() {
        let result = normalize(&json!({
            "total_balance": "n/a",
            "balance": "12.5",
            "total_used": true
        }));
        assert_eq!(result.balance, 12.5);
        assert_eq!(result.total_used, 0.0);
    }

    #[test]
    fn non_finite_strings_are_absent() {
        let result = normalize(&json!({"total_balance": "NaN", "balance": "inf", "total_used": 1}));
        assert_eq!(result.balance, 0.0);
        assert!(result.balance.is_finite());
    }

    #[test]
    fn currency_aliases() {
        assert_eq!(
            normalize(&json!({"balance": 1, "currency_code": "USD"})).currency,
            "USD"
        );
        assert_eq!(
            normalize(&json!({"balance": 1, "currency": "", "currency_type": "EUR"})).currency,
            "EUR"
        );
    }

    #[test]
    fn alias_table_lists_every_field() {
        assert_eq!(BalanceField::Balance.aliases()[0], "total_balance");
        assert_eq!(BalanceField::TotalGranted.aliases(), &[
            "total_grant",
            "grant_balance",
            "total_granted",
            "granted_balance"
        ]);
        assert_eq!(BalanceField::TotalUsed.aliases(), &["total_used", "used_balance"]);
        assert_eq!(BalanceField::Currency.aliases()[0], "currency");
        assert_eq!(BalanceField::ExpireTime.aliases()[0], "expire_time");
    }

    #[test]
    fn normalize_is_idempotent() {
        let payloads = [
            json!({"total_balance": 100.5, "currency": "USD", "total_grant": 200, "total_used": 99.5,
                   "expire_time": 1_700_000_000}),
            json!({"balance_infos": [{"total_balance": "1.25", "granted_balance": "3"}]}),
            json!({"data": {"balance": "0", "total_used": "4"}}),
            json!({}),
        ];

        for raw in payloads {
            let once = normalize(&raw);
            let twice = normalize(&serde_json::to_value(&once).unwrap());
            assert_eq!(once, twice, "payload {raw}");
        }
    }

    #[test]
    fn expire_time_from_seconds() {
        assert_eq!(
            parse_expire_time(&json!(1_700_000_000)).as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
    }

    #[test]
    fn expire_time_from_milliseconds() {
        assert_eq!(
            parse_expire_time(&json!(1_700_000_000_123_i64)).as_deref(),
            Some("2023-11-14T22:13:20.123Z")
        );
    }

    #[test]
    fn expire_time_from_numeric_string() {
        assert_eq!(
            parse_expire_time(&json!("1700000000")).as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
    }

    #[test]
    fn expire_time_from_iso_string() {
        assert_eq!(
            parse_expire_time(&json!("2025-01-31T08:00:00+08:00")).as_deref(),
            Some("2025-01-31T00:00:00.000Z")
        );
        assert_eq!(
            parse_expire_time(&json!("2025-01-31T00:00:00")).as_deref(),
            Some("2025-01-31T00:00:00.000Z")
        );
    }

    #[test]
    fn expire_time_rejects_garbage() {
        for value in [
            json!(null),
            json!(""),
            json!("soon"),
            json!(12345),
            json!(true),
            json!({"at": 1}),
        ] {
            assert!(parse_expire_time(&value).is_none(), "value {value}");
        }
    }

    #[test]
    fn expire_time_is_read_from_chosen_candidate() {
        let result = normalize(&json!({
            "data": {"balance": 5, "expires_at": "2030-06-01T00:00:00Z"}
        }));
        assert_eq!(result.expire_time.as_deref(), Some("2030-06-01T00:00:00.000Z"));
    }
}
