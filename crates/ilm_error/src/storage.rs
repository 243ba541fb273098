//! Storage error types.

/// Kinds of storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// A compare-and-swap write lost against a concurrent writer
    #[display("Revision conflict on {}: expected revision {}", key, expected)]
    Conflict {
        /// Record that was written concurrently
        key: String,
        /// Revision the writer based its update on
        expected: i64,
    },
    /// Record not found
    #[display("Record not found: {}", _0)]
    NotFound(String),
    /// Storage backend is unavailable
    #[display("Storage unavailable: {}", _0)]
    Unavailable(String),
    /// Query or write failed in the backend
    #[display("Storage backend error: {}", _0)]
    Backend(String),
    /// Schema migration failed
    #[display("Migration error: {}", _0)]
    Migration(String),
    /// A stored value could not be mapped onto the domain model
    #[display("Corrupt record: {}", _0)]
    Corrupt(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use ilm_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Conflict {
///     key: "1/2".to_string(),
///     expected: 3,
/// });
/// assert!(err.is_conflict());
/// assert!(format!("{}", err).contains("Revision conflict"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error is a lost compare-and-swap that may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, StorageErrorKind::Conflict { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// Diesel error conversions (only available with database feature)
#[cfg(feature = "database")]
impl From<diesel::result::Error> for StorageError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => StorageError::new(StorageErrorKind::NotFound(err.to_string())),
            // Serialization failures and racing inserts are lost writes, not outages
            Error::DatabaseError(
                DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::UniqueViolation,
                _,
            ) => StorageError::new(StorageErrorKind::Conflict {
                key: "transaction".to_string(),
                expected: -1,
            }),
            Error::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                StorageError::new(StorageErrorKind::Unavailable(err.to_string()))
            }
            _ => StorageError::new(StorageErrorKind::Backend(err.to_string())),
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::ConnectionError> for StorageError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        StorageError::new(StorageErrorKind::Unavailable(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for StorageError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StorageError::new(StorageErrorKind::Unavailable(err.to_string()))
    }
}
