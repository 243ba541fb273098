//! Role verification for the Ilm Garden bot.
//!
//! Verifiers grant members a direction-specific verified role and take away
//! the unverified role they joined with. Role ids come from [`IlmConfig`]
//! bindings; the platform calls go through the [`RoleGateway`] trait.
//!
//! [`IlmConfig`]: ilm_core::IlmConfig

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod gateway;

pub use engine::{RoleVerificationEngine, VerificationOutcome, VerificationRequest};
pub use error::{VerifyError, VerifyErrorKind, VerifyResult};
pub use gateway::{MemberSnapshot, RoleGateway};
