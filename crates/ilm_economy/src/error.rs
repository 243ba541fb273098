//! Economy error types.

use chrono::{DateTime, Utc};
use ilm_core::AccountKey;
use ilm_error::StorageError;

/// Economy error conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EconomyErrorKind {
    /// Amount is non-positive or outside the allowed bounds.
    #[display("Invalid amount: {}", _0)]
    InvalidAmount(String),

    /// The account cannot cover the debit.
    #[display("Insufficient funds: balance {} is below {}", balance, required)]
    InsufficientFunds {
        /// Current balance
        balance: i64,
        /// Amount that was needed
        required: i64,
    },

    /// Sender and receiver are the same account.
    #[display("Cannot transfer to the same account")]
    SameAccount,

    /// The daily reward was already claimed in this window.
    #[display("Daily reward on cooldown until {}", available_at)]
    CooldownActive {
        /// Earliest time of the next claim
        available_at: DateTime<Utc>,
    },

    /// Shop item id not in the catalog.
    #[display("Unknown item: {}", _0)]
    UnknownItem(String),

    /// Transfers are switched off in the configuration.
    #[display("Transfers are disabled")]
    TransfersDisabled,

    /// Concurrent writers kept winning until the retry budget ran out.
    #[display("Storage unavailable: {}", _0)]
    StorageUnavailable(String),

    /// The backend failed.
    #[display("Storage failure: {}", _0)]
    Storage(String),

    /// A batch referenced an account it did not load.
    #[display("Account {} is not part of this operation", _0)]
    UnknownAccount(AccountKey),

    /// Lost a compare-and-swap; retried internally and never returned.
    #[display("Write conflict: {}", _0)]
    Conflict(String),
}

/// Economy error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Economy Error: {} at line {} in {}", kind, line, file)]
pub struct EconomyError {
    kind: EconomyErrorKind,
    line: u32,
    file: &'static str,
}

impl EconomyError {
    /// Create a new error at the caller's location.
    #[track_caller]
    pub fn new(kind: EconomyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &EconomyErrorKind {
        &self.kind
    }

    /// Whether the error is a rule violation the user caused, as opposed to
    /// an operational failure.
    pub fn is_user_facing(&self) -> bool {
        use EconomyErrorKind::*;
        matches!(
            self.kind,
            InvalidAmount(_)
                | InsufficientFunds { .. }
                | SameAccount
                | CooldownActive { .. }
                | UnknownItem(_)
                | TransfersDisabled
        )
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self.kind, EconomyErrorKind::Conflict(_))
    }
}

impl From<StorageError> for EconomyError {
    #[track_caller]
    fn from(err: StorageError) -> Self {
        if err.is_conflict() {
            Self::new(EconomyErrorKind::Conflict(err.kind.to_string()))
        } else {
            Self::new(EconomyErrorKind::Storage(err.to_string()))
        }
    }
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
