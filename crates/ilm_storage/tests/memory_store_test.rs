//! Integration tests for the in-memory account store.

use chrono::Utc;
use ilm_core::{
    Account, AccountKey, AchievementUnlock, GuildId, LeaderboardMetric, Transaction,
    TransactionKind,
};
use ilm_storage::{AccountStore, InMemoryAccountStore, InventoryGrant, LedgerCommit, UnlockRecord};

fn account(guild: u64, user: u64, coins: i64) -> Account {
    let mut account = Account::new(AccountKey::new(guild, user), Utc::now());
    account.coin_balance = coins;
    account
}

#[tokio::test]
async fn test_commit_is_all_or_nothing() {
    let store = InMemoryAccountStore::new();
    let alice = store.put(account(1, 1, 100), 0).await.unwrap();
    let bob = account(1, 2, 0);

    // Stale revision for alice: nothing from the batch may land
    let mut stale = alice.clone();
    stale.revision = 0;
    let tx = Transaction::credit(bob.key(), 10, TransactionKind::Grant, None, Utc::now());
    let commit = LedgerCommit {
        accounts: vec![bob.clone(), stale],
        transactions: vec![tx],
        ..Default::default()
    };

    let err = store.commit(commit).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(store.get(bob.key()).await.unwrap().is_none());
    assert!(store.all_transactions(GuildId(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_bumps_revisions_and_records_legs() {
    let store = InMemoryAccountStore::new();
    let alice = account(1, 1, 100);
    let tx = Transaction::credit(alice.key(), 100, TransactionKind::Grant, None, Utc::now());

    let stored = store
        .commit(LedgerCommit {
            accounts: vec![alice.clone()],
            transactions: vec![tx.clone()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(stored[0].revision, 1);
    assert_eq!(store.transactions(alice.key(), 10).await.unwrap(), vec![tx]);
}

#[tokio::test]
async fn test_inventory_quantities_accumulate() {
    let store = InMemoryAccountStore::new();
    let owner = store.put(account(1, 1, 0), 0).await.unwrap();
    let grant = InventoryGrant {
        key: owner.key(),
        item_id: "dua_book".to_string(),
        quantity: 1,
        acquired_at: Utc::now(),
    };

    for _ in 0..2 {
        store
            .commit(LedgerCommit {
                inventory: vec![grant.clone()],
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let items = store.inventory(owner.key()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
}

#[tokio::test]
async fn test_achievement_unlocks_once() {
    let store = InMemoryAccountStore::new();
    let key = AccountKey::new(1u64, 1u64);
    let record = UnlockRecord {
        key,
        unlock: AchievementUnlock {
            achievement_id: "first_steps".to_string(),
            unlocked_at: Utc::now(),
        },
    };
    let commit = LedgerCommit {
        unlocks: vec![record],
        ..Default::default()
    };

    store.commit(commit.clone()).await.unwrap();
    assert!(store.commit(commit).await.unwrap_err().is_conflict());
    assert_eq!(store.achievements(key).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_leaderboard_orders_by_metric_then_user() {
    let store = InMemoryAccountStore::new();
    for (user, coins) in [(3, 50), (1, 80), (2, 50), (4, 10)] {
        store.put(account(1, user, coins), 0).await.unwrap();
    }
    // Other guilds never leak in
    store.put(account(2, 9, 1_000), 0).await.unwrap();

    let rows = store
        .leaderboard(GuildId(1), LeaderboardMetric::Coins, 3)
        .await
        .unwrap();
    let users: Vec<u64> = rows.iter().map(|r| r.user_id.get()).collect();
    assert_eq!(users, vec![1, 2, 3]);
    assert_eq!(rows[0].value, 80);
}
