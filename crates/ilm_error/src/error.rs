//! Top-level error wrapper types.

use crate::{ConfigError, GatewayError, StorageError};

/// Foundation error enum for the workspace.
///
/// # Examples
///
/// ```
/// use ilm_error::{IlmError, ConfigError};
///
/// let err: IlmError = ConfigError::invalid("economy.max_transfer", "below min_transfer").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum IlmErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Gateway/REST client error
    #[from(GatewayError)]
    Gateway(GatewayError),
}

/// Ilm Garden error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Ilm Garden Error: {}", _0)]
pub struct IlmError(Box<IlmErrorKind>);

impl IlmError {
    /// Create a new error from a kind.
    pub fn new(kind: IlmErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &IlmErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to IlmErrorKind
impl<T> From<T> for IlmError
where
    T: Into<IlmErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Ilm Garden operations.
pub type IlmResult<T> = std::result::Result<T, IlmError>;
