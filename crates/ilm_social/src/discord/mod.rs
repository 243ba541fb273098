//! Discord integration over serenity.
//!
//! - **client**: client setup and lifecycle
//! - **handler**: slash command registration and dispatch into the
//!   [`CommandRouter`](crate::CommandRouter)
//! - **gateway**: [`RoleGateway`](ilm_roles::RoleGateway) backed by the REST
//!   client
//!
//! Available with the `discord` feature.

mod client;
mod gateway;
mod handler;

pub use client::IlmBot;
pub use gateway::SerenityRoleGateway;
pub use handler::{IlmHandler, build_commands};
