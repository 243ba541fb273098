//! In-memory implementation of [`AccountStore`].

use crate::{AccountStore, LedgerCommit};
use async_trait::async_trait;
use ilm_core::{
    Account, AccountKey, AchievementUnlock, GuildId, InventoryEntry, LeaderboardEntry,
    LeaderboardMetric, Transaction,
};
use ilm_error::{StorageError, StorageErrorKind, StorageResult};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// In-memory account store.
///
/// All state lives behind one `RwLock`, so a [`LedgerCommit`] is validated and
/// applied while holding the write guard. Data is lost when the store is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    state: Arc<RwLock<State>>,
    injected_conflicts: Arc<AtomicU32>,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountKey, Account>,
    transactions: Vec<Transaction>,
    inventory: HashMap<AccountKey, BTreeMap<String, InventoryEntry>>,
    unlocks: HashMap<AccountKey, Vec<AchievementUnlock>>,
}

impl State {
    fn check_revision(&self, key: AccountKey, expected: i64) -> StorageResult<()> {
        let current = self.accounts.get(&key).map(|a| a.revision).unwrap_or(0);
        if current != expected {
            debug!(%key, expected, current, "Revision mismatch");
            return Err(conflict(key, expected));
        }
        Ok(())
    }

    fn is_unlocked(&self, key: AccountKey, achievement_id: &str) -> bool {
        self.unlocks
            .get(&key)
            .is_some_and(|u| u.iter().any(|u| u.achievement_id == achievement_id))
    }

    fn store(&mut self, mut account: Account) -> Account {
        account.revision += 1;
        self.accounts.insert(account.key(), account.clone());
        account
    }
}

fn conflict(key: AccountKey, expected: i64) -> StorageError {
    StorageError::new(StorageErrorKind::Conflict {
        key: key.to_string(),
        expected,
    })
}

impl InMemoryAccountStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a conflict without touching
    /// state, as if another writer had won each race.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of accounts stored.
    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, key: AccountKey) -> StorageResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&key).cloned())
    }

    #[instrument(skip(self, account), fields(key = %account.key()))]
    async fn put(&self, mut account: Account, expected_revision: i64) -> StorageResult<Account> {
        let mut state = self.state.write().await;
        state.check_revision(account.key(), expected_revision)?;
        account.revision = expected_revision;
        Ok(state.store(account))
    }

    async fn append_transaction(&self, transaction: Transaction) -> StorageResult<()> {
        self.state.write().await.transactions.push(transaction);
        Ok(())
    }

    #[instrument(
        skip(self, commit),
        fields(accounts = commit.accounts.len(), legs = commit.transactions.len())
    )]
    async fn commit(&self, commit: LedgerCommit) -> StorageResult<Vec<Account>> {
        if self.take_injected_conflict() {
            warn!("Injected conflict");
            let key = commit
                .accounts
                .first()
                .map(|a| a.key().to_string())
                .unwrap_or_default();
            return Err(StorageError::new(StorageErrorKind::Conflict {
                key,
                expected: -1,
            }));
        }

        let mut state = self.state.write().await;

        // Validate everything before the first mutation
        for account in &commit.accounts {
            state.check_revision(account.key(), account.revision)?;
        }
        for (i, record) in commit.unlocks.iter().enumerate() {
            let id = &record.unlock.achievement_id;
            let repeated = commit.unlocks[..i]
                .iter()
                .any(|r| r.key == record.key && &r.unlock.achievement_id == id);
            if repeated || state.is_unlocked(record.key, id) {
                return Err(conflict(record.key, -1));
            }
        }

        let stored = commit
            .accounts
            .into_iter()
            .map(|account| state.store(account))
            .collect();

        state.transactions.extend(commit.transactions);

        for grant in commit.inventory {
            state
                .inventory
                .entry(grant.key)
                .or_default()
                .entry(grant.item_id.clone())
                .and_modify(|entry| entry.quantity += grant.quantity)
                .or_insert(InventoryEntry {
                    item_id: grant.item_id,
                    quantity: grant.quantity,
                    acquired_at: grant.acquired_at,
                });
        }

        for record in commit.unlocks {
            state.unlocks.entry(record.key).or_default().push(record.unlock);
        }

        Ok(stored)
    }

    async fn transactions(
        &self,
        key: AccountKey,
        limit: usize,
    ) -> StorageResult<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.from_account() == Some(key) || tx.to_account() == Some(key))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_transactions(&self, guild_id: GuildId) -> StorageResult<Vec<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn leaderboard(
        &self,
        guild_id: GuildId,
        metric: LeaderboardMetric,
        limit: usize,
    ) -> StorageResult<Vec<LeaderboardEntry>> {
        let state = self.state.read().await;
        let mut rows: Vec<LeaderboardEntry> = state
            .accounts
            .values()
            .filter(|a| a.guild_id == guild_id)
            .map(|a| LeaderboardEntry {
                user_id: a.user_id,
                value: metric.value(a),
            })
            .collect();
        rows.sort_by_key(|row| (Reverse(row.value), row.user_id));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn inventory(&self, key: AccountKey) -> StorageResult<Vec<InventoryEntry>> {
        let state = self.state.read().await;
        Ok(state
            .inventory
            .get(&key)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn achievements(&self, key: AccountKey) -> StorageResult<Vec<AchievementUnlock>> {
        let state = self.state.read().await;
        Ok(state.unlocks.get(&key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_put_requires_matching_revision() {
        let store = InMemoryAccountStore::new();
        let key = AccountKey::new(1u64, 1u64);
        let account = Account::new(key, Utc::now());

        let stored = store.put(account.clone(), 0).await.unwrap();
        assert_eq!(stored.revision, 1);

        // A second creation loses
        let err = store.put(account, 0).await.unwrap_err();
        assert!(err.is_conflict());

        let again = store.put(stored.clone(), 1).await.unwrap();
        assert_eq!(again.revision, 2);
    }

    #[tokio::test]
    async fn test_injected_conflicts_are_consumed() {
        let store = InMemoryAccountStore::new();
        let account = Account::new(AccountKey::new(1u64, 1u64), Utc::now());
        store.inject_conflicts(1);

        let commit = LedgerCommit {
            accounts: vec![account],
            ..Default::default()
        };
        assert!(store.commit(commit.clone()).await.unwrap_err().is_conflict());
        assert_eq!(store.account_count().await, 0);
        assert!(store.commit(commit).await.is_ok());
    }
}
