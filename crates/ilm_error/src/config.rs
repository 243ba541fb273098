//! Configuration error types.

use derive_getters::Getters;

/// Why a configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// The file could not be read.
    #[display("Failed to read {path}: {reason}")]
    Read {
        /// File path
        path: String,
        /// I/O failure
        reason: String,
    },

    /// The TOML did not parse into the configuration shape.
    #[display("Failed to parse config: {_0}")]
    Parse(String),

    /// A setting holds an out-of-range or inconsistent value.
    #[display("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Dotted setting path, e.g. `economy.min_transfer`
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// A binding names a role missing from `[roles]`.
    #[display("Unknown role name '{_0}'")]
    UnknownRole(String),

    /// No `[verification.<direction>]` table.
    #[display("No verification binding for '{_0}'")]
    UnboundDirection(String),

    /// Two catalog entries share an id.
    #[display("Duplicate {catalog} id '{id}'")]
    DuplicateId {
        /// `shop` or `achievements`
        catalog: String,
        /// Repeated id
        id: String,
    },

    /// A required environment setting or build feature is absent.
    #[display("Missing setting: {_0}")]
    Missing(String),
}

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use ilm_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::new(ConfigErrorKind::UnknownRole("female_verifier".into()));
    /// assert!(err.to_string().contains("female_verifier"));
    /// ```
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for [`ConfigErrorKind::InvalidValue`].
    #[track_caller]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        })
    }
}
