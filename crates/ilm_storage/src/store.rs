//! The persistence trait and its atomic write batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ilm_core::{
    Account, AccountKey, AchievementUnlock, GuildId, InventoryEntry, LeaderboardEntry,
    LeaderboardMetric, Transaction,
};
use ilm_error::StorageResult;

/// Inventory quantity to add for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryGrant {
    /// Owner of the inventory
    pub key: AccountKey,
    /// Catalog item id
    pub item_id: String,
    /// Quantity added (the row is created on first grant)
    pub quantity: i32,
    /// Acquisition time recorded on a new row
    pub acquired_at: DateTime<Utc>,
}

/// Achievement unlock to record for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockRecord {
    /// Owner of the achievement
    pub key: AccountKey,
    /// The unlock itself
    pub unlock: AchievementUnlock,
}

/// Everything one ledger mutation writes, applied all-or-nothing.
///
/// Each account carries the revision it was loaded at; the store rejects the
/// whole batch with a conflict when any stored revision differs, and persists
/// each account at `revision + 1` otherwise. Recording an achievement that is
/// already unlocked is also a conflict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerCommit {
    /// Accounts to write, at their expected revision
    pub accounts: Vec<Account>,
    /// Ledger legs to append
    pub transactions: Vec<Transaction>,
    /// Inventory increments
    pub inventory: Vec<InventoryGrant>,
    /// Achievement unlocks
    pub unlocks: Vec<UnlockRecord>,
}

impl LedgerCommit {
    /// Whether the batch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.transactions.is_empty()
            && self.inventory.is_empty()
            && self.unlocks.is_empty()
    }
}

/// Durable storage for accounts, ledger legs, inventories and achievements.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load an account.
    async fn get(&self, key: AccountKey) -> StorageResult<Option<Account>>;

    /// Write one account if its stored revision equals `expected_revision`
    /// (0 for an account that must not exist yet).
    ///
    /// Returns the account as stored, at `expected_revision + 1`.
    async fn put(&self, account: Account, expected_revision: i64) -> StorageResult<Account>;

    /// Append a single ledger leg.
    async fn append_transaction(&self, transaction: Transaction) -> StorageResult<()>;

    /// Apply a batch atomically. Returns the written accounts as stored, in
    /// batch order.
    async fn commit(&self, commit: LedgerCommit) -> StorageResult<Vec<Account>>;

    /// Most recent legs touching an account, newest first.
    async fn transactions(&self, key: AccountKey, limit: usize)
    -> StorageResult<Vec<Transaction>>;

    /// Every leg recorded in a guild, oldest first.
    async fn all_transactions(&self, guild_id: GuildId) -> StorageResult<Vec<Transaction>>;

    /// Top accounts of a guild by `metric`, ties broken by user id.
    async fn leaderboard(
        &self,
        guild_id: GuildId,
        metric: LeaderboardMetric,
        limit: usize,
    ) -> StorageResult<Vec<LeaderboardEntry>>;

    /// Items owned by an account, ordered by item id.
    async fn inventory(&self, key: AccountKey) -> StorageResult<Vec<InventoryEntry>>;

    /// Achievements unlocked by an account, oldest first.
    async fn achievements(&self, key: AccountKey) -> StorageResult<Vec<AchievementUnlock>>;
}
