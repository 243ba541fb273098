//! Slash command routing for the Ilm Garden bot.
//!
//! [`CommandRouter`] validates a normalized [`CommandRequest`] against the
//! [`CommandSchema`], dispatches it to the ledger, reward or verification
//! engine and renders a [`Reply`]. The optional `discord` module adapts
//! serenity interactions to that request shape.
//!
//! # Example
//!
//! ```rust
//! use ilm_core::{GuildId, IlmConfig};
//! use ilm_economy::{Ledger, RewardEngine};
//! use ilm_roles::{MemberSnapshot, RoleGateway, RoleVerificationEngine};
//! use ilm_social::{CommandRequest, CommandRouter};
//! use ilm_storage::InMemoryAccountStore;
//! use std::sync::Arc;
//!
//! # async fn demo(gateway: Arc<dyn RoleGateway>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = IlmConfig::default();
//! let ledger = Arc::new(Ledger::from_config(Arc::new(InMemoryAccountStore::new()), &config));
//! let rewards = RewardEngine::from_config(ledger, &config);
//! let roles = Arc::new(RoleVerificationEngine::from_config(gateway, &config)?);
//! let router = CommandRouter::new(rewards, roles);
//!
//! let actor = MemberSnapshot::new(42u64, "amina", []);
//! let reply = router
//!     .handle(CommandRequest::new("balance", actor, Some(GuildId::from(7u64))))
//!     .await;
//! assert!(reply.content.contains("100"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod options;
mod quiz;
mod router;

#[cfg(feature = "discord")]
pub mod discord;

pub use error::{CommandError, RouterError, RouterErrorKind, RouterResult};
pub use options::{
    CommandSchema, CommandSpec, MAX_HISTORY, OptionKind, OptionSpec, OptionValue, ParsedOptions,
};
pub use quiz::{
    ANSWER_LETTERS, QUIZ_TIMEOUT_MINUTES, QuestionBank, QuizCategory, QuizQuestion, QuizSessions,
};
pub use router::{ActorPermissions, CommandRequest, CommandRouter, Reply, render_error};
