//! Core data model and configuration for the Ilm Garden bot.
//!
//! This crate holds the types every engine agrees on: platform ids, accounts,
//! ledger legs, shop and achievement catalogs, the game reward table, and the immutable
//! [`IlmConfig`] loaded at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod account;
mod catalog;
mod config;
mod games;
mod ids;
mod records;
mod transaction;

pub use account::Account;
pub use catalog::{
    Achievement, AchievementCatalog, AchievementMetric, ItemCategory, ShopCatalog, ShopItem,
};
pub use config::{
    ConfigResult, Direction, EconomyConfig, EconomyConfigBuilder, IlmConfig, IlmConfigBuilder,
    ResolvedBinding, StorageBackend, StorageConfig, VerificationBinding,
};
pub use games::{Difficulty, GameKind, GameRewardTable};
pub use ids::{AccountKey, GuildId, RoleId, UserId};
pub use records::{AchievementUnlock, InventoryEntry, LeaderboardEntry, LeaderboardMetric};
pub use transaction::{Transaction, TransactionKind};
