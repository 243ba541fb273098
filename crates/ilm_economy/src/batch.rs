//! The working set of one ledger mutation.

use crate::{EconomyError, EconomyErrorKind, EconomyResult};
use chrono::{DateTime, Utc};
use ilm_core::{
    Account, AccountKey, AchievementUnlock, EconomyConfig, InventoryEntry, Transaction,
    TransactionKind,
};
use ilm_storage::{AccountStore, InventoryGrant, LedgerCommit, UnlockRecord};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Items and achievements an account already holds.
#[derive(Debug, Clone, Default)]
pub struct Holdings {
    /// Inventory rows
    pub items: Vec<InventoryEntry>,
    /// Unlocked achievement ids
    pub unlocked: HashSet<String>,
}

impl Holdings {
    /// Number of different items owned.
    pub fn distinct_items(&self) -> usize {
        self.items.len()
    }
}

/// Accounts loaded for one attempt, plus everything the attempt will write.
///
/// Operations mutate the batch in memory; nothing reaches the store until the
/// batch is turned into a [`LedgerCommit`]. Unknown accounts are opened on
/// load and funded with the starting balance through a `grant` leg.
#[derive(Debug)]
pub struct LedgerBatch<'a> {
    config: &'a EconomyConfig,
    now: DateTime<Utc>,
    accounts: BTreeMap<AccountKey, Account>,
    dirty: BTreeSet<AccountKey>,
    transactions: Vec<Transaction>,
    inventory: Vec<InventoryGrant>,
    unlocks: Vec<UnlockRecord>,
    holdings: HashMap<AccountKey, Holdings>,
}

impl<'a> LedgerBatch<'a> {
    pub(crate) async fn load(
        store: &dyn AccountStore,
        config: &'a EconomyConfig,
        keys: &[AccountKey],
        now: DateTime<Utc>,
        with_holdings: bool,
    ) -> EconomyResult<LedgerBatch<'a>> {
        let mut batch = Self {
            config,
            now,
            accounts: BTreeMap::new(),
            dirty: BTreeSet::new(),
            transactions: Vec::new(),
            inventory: Vec::new(),
            unlocks: Vec::new(),
            holdings: HashMap::new(),
        };

        for &key in keys {
            if batch.accounts.contains_key(&key) {
                continue;
            }
            match store.get(key).await? {
                Some(account) => {
                    batch.accounts.insert(key, account);
                }
                None => batch.open(key),
            }
            if with_holdings {
                let holdings = Holdings {
                    items: store.inventory(key).await?,
                    unlocked: store
                        .achievements(key)
                        .await?
                        .into_iter()
                        .map(|u| u.achievement_id)
                        .collect(),
                };
                batch.holdings.insert(key, holdings);
            }
        }

        Ok(batch)
    }

    fn open(&mut self, key: AccountKey) {
        debug!(%key, "Opening account");
        let mut account = Account::new(key, self.now);
        let starting = *self.config.starting_balance();
        if starting > 0 {
            account.coin_balance = starting;
            self.transactions.push(Transaction::credit(
                key,
                starting,
                TransactionKind::Grant,
                Some("starting balance".to_string()),
                self.now,
            ));
        }
        self.accounts.insert(key, account);
        self.dirty.insert(key);
    }

    /// Time the mutation is evaluated at.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Economy constants.
    pub fn config(&self) -> &EconomyConfig {
        self.config
    }

    /// Current in-batch state of an account.
    pub fn account(&self, key: AccountKey) -> EconomyResult<&Account> {
        self.accounts
            .get(&key)
            .ok_or_else(|| EconomyError::new(EconomyErrorKind::UnknownAccount(key)))
    }

    /// Holdings loaded for an account, if the batch was loaded with them.
    pub fn holdings(&self, key: AccountKey) -> Option<&Holdings> {
        self.holdings.get(&key)
    }

    /// Mutate an account and mark it for writing.
    pub fn update<R>(
        &mut self,
        key: AccountKey,
        f: impl FnOnce(&mut Account) -> R,
    ) -> EconomyResult<R> {
        let now = self.now;
        let account = self
            .accounts
            .get_mut(&key)
            .ok_or_else(|| EconomyError::new(EconomyErrorKind::UnknownAccount(key)))?;
        let result = f(account);
        account.updated_at = now;
        self.dirty.insert(key);
        Ok(result)
    }

    /// Mint `amount` into an account.
    pub fn credit(
        &mut self,
        key: AccountKey,
        amount: i64,
        kind: TransactionKind,
        note: Option<String>,
    ) -> EconomyResult<Transaction> {
        require_positive(amount)?;
        self.update(key, |account| {
            account.coin_balance += amount;
            account.total_earned += amount;
        })?;
        let leg = Transaction::credit(key, amount, kind, note, self.now);
        self.transactions.push(leg.clone());
        Ok(leg)
    }

    /// Sink `amount` out of an account.
    pub fn debit(
        &mut self,
        key: AccountKey,
        amount: i64,
        kind: TransactionKind,
        note: Option<String>,
    ) -> EconomyResult<Transaction> {
        require_positive(amount)?;
        let balance = self.account(key)?.coin_balance;
        if balance < amount {
            return Err(EconomyError::new(EconomyErrorKind::InsufficientFunds {
                balance,
                required: amount,
            }));
        }
        self.update(key, |account| {
            account.coin_balance -= amount;
            account.total_spent += amount;
        })?;
        let leg = Transaction::debit(key, amount, kind, note, self.now);
        self.transactions.push(leg.clone());
        Ok(leg)
    }

    /// Move coins between two accounts as a correlated pair of legs.
    pub fn transfer(
        &mut self,
        from: AccountKey,
        to: AccountKey,
        amount: i64,
        note: Option<String>,
    ) -> EconomyResult<(Transaction, Transaction)> {
        if from == to {
            return Err(EconomyError::new(EconomyErrorKind::SameAccount));
        }
        let correlation_id = Uuid::new_v4();
        let debit = self.debit(from, amount, TransactionKind::Transfer, note.clone())?;
        let credit = self.credit(to, amount, TransactionKind::Transfer, note)?;

        // Tag the legs already pushed
        let len = self.transactions.len();
        for leg in &mut self.transactions[len - 2..] {
            leg.correlation_id = Some(correlation_id);
        }
        Ok((debit.correlated(correlation_id), credit.correlated(correlation_id)))
    }

    /// Add good deed points.
    pub fn award_points(&mut self, key: AccountKey, points: i64) -> EconomyResult<()> {
        if points == 0 {
            return Ok(());
        }
        self.update(key, |account| account.good_deed_points += points)
    }

    /// Add `quantity` of an item to an account's inventory.
    pub fn grant_item(&mut self, key: AccountKey, item_id: &str, quantity: i32) {
        self.inventory.push(InventoryGrant {
            key,
            item_id: item_id.to_string(),
            quantity,
            acquired_at: self.now,
        });
    }

    /// Record an achievement unlock.
    pub fn unlock(&mut self, key: AccountKey, achievement_id: &str) {
        if let Some(holdings) = self.holdings.get_mut(&key) {
            holdings.unlocked.insert(achievement_id.to_string());
        }
        self.unlocks.push(UnlockRecord {
            key,
            unlock: AchievementUnlock {
                achievement_id: achievement_id.to_string(),
                unlocked_at: self.now,
            },
        });
    }

    /// Split into the writes and the final in-memory account states.
    pub(crate) fn into_parts(self) -> (LedgerCommit, BTreeMap<AccountKey, Account>) {
        let accounts = self
            .dirty
            .iter()
            .filter_map(|key| self.accounts.get(key).cloned())
            .collect();
        let commit = LedgerCommit {
            accounts,
            transactions: self.transactions,
            inventory: self.inventory,
            unlocks: self.unlocks,
        };
        (commit, self.accounts)
    }
}

fn require_positive(amount: i64) -> EconomyResult<()> {
    if amount <= 0 {
        return Err(EconomyError::new(EconomyErrorKind::InvalidAmount(format!(
            "{} is not a positive amount",
            amount
        ))));
    }
    Ok(())
}
