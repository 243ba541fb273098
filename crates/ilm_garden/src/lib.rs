//! Ilm Garden bot assembly.
//!
//! The binary loads an [`IlmConfig`](ilm_core::IlmConfig), opens the account
//! store it names and serves slash commands over Discord. The pieces live
//! here so they can be exercised without a gateway connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod app;
mod observability;

pub use app::{DATABASE_URL_ENV, build_router, load_config, open_store};
pub use observability::{ObservabilityConfig, init_observability};
