//! In-process lock table serializing mutations per account.

use ilm_core::AccountKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Entries are pruned once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per account key.
///
/// Multi-account operations lock in sorted key order, so two transfers in
/// opposite directions cannot deadlock.
#[derive(Debug, Default)]
pub struct AccountLocks {
    table: Mutex<HashMap<AccountKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Guards held for the duration of a mutation.
#[derive(Debug)]
pub struct AccountGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountLocks {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key, in sorted order, waiting as needed.
    pub async fn acquire(&self, keys: &[AccountKey]) -> AccountGuards {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let mutexes: Vec<_> = {
            let mut table = self.table.lock();
            if table.len() > PRUNE_THRESHOLD {
                table.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            }
            keys.iter()
                .map(|key| table.entry(*key).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        AccountGuards { _guards: guards }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Whether the table tracks no keys.
    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(AccountLocks::new());
        let key = AccountKey::new(1u64, 1u64);

        let held = locks.acquire(&[key]).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&[key]).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(held);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_opposite_order_does_not_deadlock() {
        let locks = Arc::new(AccountLocks::new());
        let a = AccountKey::new(1u64, 1u64);
        let b = AccountKey::new(1u64, 2u64);

        let mut tasks = Vec::new();
        for i in 0..50 {
            let locks = locks.clone();
            let keys = if i % 2 == 0 { [a, b] } else { [b, a] };
            tasks.push(tokio::spawn(async move {
                let _guards = locks.acquire(&keys).await;
                tokio::task::yield_now().await;
            }));
        }
        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .unwrap()
                .unwrap();
        }
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_keys_lock_once() {
        let locks = AccountLocks::new();
        let key = AccountKey::new(3u64, 3u64);
        // Would deadlock if the key were locked twice
        let _guards = locks.acquire(&[key, key]).await;
    }
}
