//! API key validation.
//!
//! Keys are checked against shape rules before they are sent anywhere. Rules
//! run in a fixed order and the first failure wins:
//!
//! 1. the input is present and is a string
//! 2. the trimmed key starts with the prefix (`sk-`)
//! 3. the trimmed length is inside `[min_length, max_length]`
//! 4. the body after the prefix is `[A-Za-z0-9_-]+`
//! 5. optionally, the body has enough distinct characters

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::error::KeyRejection;

/// Prefix every accepted key must start with.
pub const DEFAULT_KEY_PREFIX: &str = "sk-";

/// Minimum trimmed key length (`sk-` plus 17 characters).
pub const DEFAULT_MIN_KEY_LENGTH: usize = 20;

/// Maximum trimmed key length.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 300;

/// Shape rules for caller-supplied keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRules {
    /// Required prefix.
    pub prefix: String,
    /// Minimum trimmed length, prefix included.
    pub min_length: usize,
    /// Maximum trimmed length, prefix included.
    pub max_length: usize,
    /// Minimum ratio of distinct characters in the key body, if enforced.
    pub min_unique_ratio: Option<f64>,
}

impl Default for KeyRules {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            min_length: DEFAULT_MIN_KEY_LENGTH,
            max_length: DEFAULT_MAX_KEY_LENGTH,
            min_unique_ratio: None,
        }
    }
}

impl KeyRules {
    /// Enable the character-diversity check.
    #[must_use]
    pub fn with_min_unique_ratio(mut self, ratio: f64) -> Self {
        self.min_unique_ratio = Some(ratio);
        self
    }

    /// Validate a raw key string.
    ///
    /// On success the returned key is the trimmed input.
    ///
    /// # Errors
    ///
    /// Returns the first rule the key violates.
    pub fn validate(&self, raw: &str) -> Result<ApiKey, KeyRejection> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(KeyRejection::Missing);
        }

        let Some(body) = key.strip_prefix(self.prefix.as_str()) else {
            return Err(KeyRejection::MissingPrefix {
                prefix: self.prefix.clone(),
            });
        };

        let length = key.chars().count();
        if length < self.min_length {
            return Err(KeyRejection::TooShort {
                length,
                min: self.min_length,
            });
        }
        if length > self.max_length {
            return Err(KeyRejection::TooLong {
                length,
                max: self.max_length,
            });
        }

        if body.is_empty() || !body.chars().all(is_key_char) {
            return Err(KeyRejection::IllegalCharacters);
        }

        if let Some(ratio) = self.min_unique_ratio {
            let unique = body.chars().collect::<HashSet<_>>().len();
            #[allow(clippy::cast_precision_loss)]
            let diverse_enough = unique as f64 >= body.len() as f64 * ratio;
            if !diverse_enough {
                return Err(KeyRejection::LowEntropy);
            }
        }

        Ok(ApiKey(key.to_string()))
    }

    /// Validate an untyped JSON field (as received in a request body).
    ///
    /// # Errors
    ///
    /// Returns [`KeyRejection::Missing`] for an absent or `null` field,
    /// [`KeyRejection::NotAString`] for any other non-string, and otherwise
    /// whatever [`KeyRules::validate`] returns.
    pub fn validate_value(&self, raw: Option<&Value>) -> Result<ApiKey, KeyRejection> {
        match raw {
            None | Some(Value::Null) => Err(KeyRejection::Missing),
            Some(Value::String(s)) => self.validate(s),
            Some(_) => Err(KeyRejection::NotAString),
        }
    }
}

/// Validate a key with the default rules.
///
/// # Errors
///
/// Returns the first rule the key violates.
pub fn validate(raw: &str) -> Result<ApiKey, KeyRejection> {
    KeyRules::default().validate(raw)
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// A key that passed validation.
///
/// The key is never printed in full: `Debug` shows the masked form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    /// The trimmed key, for use in an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form safe for logs and responses (`sk-abcde...wxyz`).
    #[must_use]
    pub fn masked(&self) -> String {
        mask_key(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

/// Mask an arbitrary (possibly invalid) key string for display.
#[must_use]
pub fn mask_key(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(3).collect();
        return format!("{head}...");
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
