//! Router error types.

use derive_more::{Display, Error};
use ilm_economy::EconomyError;
use ilm_roles::VerifyError;

/// Request-level error conditions raised before any engine runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum RouterErrorKind {
    /// No such command.
    #[display("Command not found: {}", _0)]
    UnknownCommand(String),

    /// Economy commands need a guild.
    #[display("Command '{}' needs a server", _0)]
    NotGuildContext(String),

    /// Missing required option.
    #[display("Missing required option '{}' for command '{}'", option, command)]
    MissingOption {
        /// Command name
        command: String,
        /// Option name
        option: String,
    },

    /// Option has the wrong type or is out of range.
    #[display("Invalid option '{}' for command '{}': {}", option, command, reason)]
    InvalidOption {
        /// Command name
        command: String,
        /// Option name
        option: String,
        /// What was wrong
        reason: String,
    },

    /// `/answer` without an open quiz.
    #[display("No open quiz to answer")]
    NoActiveQuiz,

    /// The actor lacks a platform permission.
    #[display("Permission denied for '{}': {}", command, reason)]
    PermissionDenied {
        /// Command name
        command: String,
        /// Missing permission
        reason: String,
    },
}

/// Router error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Router Error: {} at line {} in {}", kind, line, file)]
pub struct RouterError {
    kind: RouterErrorKind,
    line: u32,
    file: &'static str,
}

impl RouterError {
    /// Create a new error at the caller's location.
    #[track_caller]
    pub fn new(kind: RouterErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RouterErrorKind {
        &self.kind
    }
}

/// Result type for request validation.
pub type RouterResult<T> = Result<T, RouterError>;

/// Any failure while handling a command.
#[derive(Debug, Display, derive_more::From, Error)]
pub enum CommandError {
    /// Request validation failed.
    Router(RouterError),
    /// The ledger or reward engine refused.
    Economy(EconomyError),
    /// Role verification failed.
    Verify(VerifyError),
}

impl CommandError {
    /// Whether the failure is the user's to fix.
    pub fn is_user_facing(&self) -> bool {
        match self {
            Self::Router(_) => true,
            Self::Economy(e) => e.is_user_facing(),
            Self::Verify(e) => e.is_user_facing(),
        }
    }
}
