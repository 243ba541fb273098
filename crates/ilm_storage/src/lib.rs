//! Account and ledger persistence for the Ilm Garden bot.
//!
//! This crate provides the [`AccountStore`] trait the economy engines commit
//! through, together with two implementations:
//!
//! - [`InMemoryAccountStore`]: process-local, used by tests and `--memory` runs
//! - `PostgresAccountStore`: diesel + r2d2 backed (feature `database`)
//!
//! Every write is a compare-and-swap on the account `revision`; a lost race
//! surfaces as [`StorageErrorKind::Conflict`](ilm_error::StorageErrorKind) and
//! leaves the store untouched.
//!
//! # Example
//!
//! ```rust
//! use ilm_core::{Account, AccountKey};
//! use ilm_storage::{AccountStore, InMemoryAccountStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryAccountStore::new();
//! let key = AccountKey::new(1u64, 2u64);
//! let account = Account::new(key, chrono::Utc::now());
//!
//! let stored = store.put(account, 0).await?;
//! assert_eq!(stored.revision, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;
mod store;

#[cfg(feature = "database")]
mod database;

pub use memory::InMemoryAccountStore;
pub use store::{AccountStore, InventoryGrant, LedgerCommit, UnlockRecord};

#[cfg(feature = "database")]
pub use database::{PostgresAccountStore, run_migrations};
