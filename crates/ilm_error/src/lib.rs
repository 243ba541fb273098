//! Error types for the Ilm Garden bot.
//!
//! This crate provides the foundation error types shared by every other crate
//! in the workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use ilm_error::{IlmResult, ConfigError};
//!
//! fn load() -> IlmResult<String> {
//!     Err(ConfigError::invalid("roles", "section is empty"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod gateway;
mod storage;

pub use config::{ConfigError, ConfigErrorKind};
pub use error::{IlmError, IlmErrorKind, IlmResult};
pub use gateway::{GatewayError, GatewayErrorKind, GatewayResult};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
