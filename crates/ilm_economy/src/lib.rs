//! Ledger and reward engines for the Ilm Garden bot.
//!
//! The [`Ledger`] owns every coin movement: credits, debits, transfers,
//! donations, purchases and soft resets. The [`RewardEngine`] layers the daily
//! cooldown, streaks, game payouts and achievements on top of it.
//!
//! Each account's balance always equals the replay of its ledger legs; see
//! [`replay_balances`] and [`Ledger::audit`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ilm_core::{AccountKey, EconomyConfig, ShopCatalog};
//! use ilm_economy::Ledger;
//! use ilm_storage::InMemoryAccountStore;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryAccountStore::new());
//! let ledger = Ledger::new(store, EconomyConfig::default(), ShopCatalog::default());
//!
//! let alice = AccountKey::new(1u64, 10u64);
//! let bob = AccountKey::new(1u64, 20u64);
//! let transfer = ledger.transfer(alice, bob, 40, None).await?;
//! assert_eq!(transfer.sender.coin_balance, 60);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod error;
mod ledger;
mod locks;
mod replay;
mod rewards;

pub use batch::{Holdings, LedgerBatch};
pub use error::{EconomyError, EconomyErrorKind, EconomyResult};
pub use ledger::{DonationCause, Donation, Ledger, MAX_LEADERBOARD, Purchase, Transfer};
pub use locks::{AccountGuards, AccountLocks};
pub use replay::{BalanceMismatch, replay_balances};
pub use rewards::{
    DailyClaim, DailyStatus, GameOutcome, RewardEngine, daily_reward, daily_status, next_streak, weekly_bonus,
};
