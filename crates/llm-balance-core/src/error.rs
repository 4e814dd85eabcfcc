//! Error types for llm-balance-core.

/// Why a caller-supplied API key was rejected.
///
/// Each rule of the validator has its own variant so callers can report a
/// specific reason instead of a generic "invalid key".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyRejection {
    /// No key was supplied, or it was blank after trimming.
    #[error("API key is required")]
    Missing,

    /// The key was supplied but is not a JSON string.
    #[error("API key must be a string")]
    NotAString,

    /// The key does not start with the expected prefix.
    #[error("API key must start with {prefix}")]
    MissingPrefix {
        /// The required prefix.
        prefix: String,
    },

    /// The trimmed key is shorter than the configured minimum.
    #[error("API key is too short: {length} < {min}")]
    TooShort {
        /// Length of the trimmed key.
        length: usize,
        /// Configured minimum length.
        min: usize,
    },

    /// The trimmed key is longer than the configured maximum.
    #[error("API key is too long: {length} > {max}")]
    TooLong {
        /// Length of the trimmed key.
        length: usize,
        /// Configured maximum length.
        max: usize,
    },

    /// The key body contains characters outside `[A-Za-z0-9_-]`.
    #[error("API key contains illegal characters")]
    IllegalCharacters,

    /// The key body has too few distinct characters to be plausible.
    #[error("API key has too little character diversity")]
    LowEntropy,
}

impl KeyRejection {
    /// Stable machine-readable code for this rejection.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Missing => "MISSING_API_KEY",
            Self::NotAString => "API_KEY_NOT_STRING",
            Self::MissingPrefix { .. } => "INVALID_KEY_PREFIX",
            Self::TooShort { .. } => "API_KEY_TOO_SHORT",
            Self::TooLong { .. } => "API_KEY_TOO_LONG",
            Self::IllegalCharacters => "API_KEY_ILLEGAL_CHARACTERS",
            Self::LowEntropy => "API_KEY_LOW_ENTROPY",
        }
    }
}

/// A provider name that does not match any supported provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);
