//! Verification error types.

use ilm_core::{Direction, RoleId};

/// Verification error conditions.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum VerifyErrorKind {
    /// The command was used outside a guild.
    #[display("This command can only be used in a server")]
    NotGuildContext,

    /// The actor lacks the verifier role.
    #[display("Missing verifier role {}", required)]
    Forbidden {
        /// Role the actor needs
        required: RoleId,
    },

    /// The target cannot be verified.
    #[display("Invalid target: {}", _0)]
    InvalidTarget(String),

    /// The target already holds the destination role.
    #[display("Target already verified")]
    AlreadyVerified,

    /// The platform refused the role change on permission grounds.
    #[display("Role hierarchy violation: {}", _0)]
    HierarchyViolation(String),

    /// Any other platform failure.
    #[display("Gateway failure: {}", _0)]
    Gateway(String),

    /// No roles are configured for the direction.
    #[display("No verification roles configured for {}", _0)]
    UnboundDirection(Direction),
}

/// Verification error with source location.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Verify Error: {} at line {} in {}", kind, line, file)]
pub struct VerifyError {
    kind: VerifyErrorKind,
    line: u32,
    file: &'static str,
}

impl VerifyError {
    /// Create a new error at the caller's location.
    #[track_caller]
    pub fn new(kind: VerifyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VerifyErrorKind {
        &self.kind
    }

    /// Whether the error is answered as a normal reply rather than logged as
    /// a failure.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self.kind,
            VerifyErrorKind::Gateway(_) | VerifyErrorKind::UnboundDirection(_)
        )
    }
}

impl From<ilm_error::GatewayError> for VerifyError {
    #[track_caller]
    fn from(err: ilm_error::GatewayError) -> Self {
        let kind = if err.is_hierarchy_violation() {
            VerifyErrorKind::HierarchyViolation(err.kind().to_string())
        } else {
            VerifyErrorKind::Gateway(err.kind().to_string())
        };
        Self::new(kind)
    }
}

/// Result type for verification.
pub type VerifyResult<T> = Result<T, VerifyError>;
