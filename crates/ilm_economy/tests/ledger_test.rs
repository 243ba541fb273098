//! Ledger engine integration tests over the in-memory store.

use ilm_core::{
    AccountKey, EconomyConfig, EconomyConfigBuilder, GuildId, LeaderboardMetric, ShopCatalog,
    TransactionKind,
};
use ilm_economy::{DonationCause, EconomyErrorKind, Ledger, replay_balances};
use ilm_storage::{AccountStore, InMemoryAccountStore};
use std::sync::Arc;

const GUILD: u64 = 42;

fn key(user: u64) -> AccountKey {
    AccountKey::new(GUILD, user)
}

fn setup_with(config: EconomyConfig) -> (Arc<InMemoryAccountStore>, Arc<Ledger>) {
    let store = Arc::new(InMemoryAccountStore::new());
    let ledger = Arc::new(Ledger::new(store.clone(), config, ShopCatalog::default()));
    (store, ledger)
}

fn setup() -> (Arc<InMemoryAccountStore>, Arc<Ledger>) {
    setup_with(EconomyConfig::default())
}

/// Bring an account to exactly `balance` coins (accounts open with 100).
async fn fund(ledger: &Ledger, key: AccountKey, balance: i64) {
    let opened = ledger.balance(key).await.unwrap();
    let delta = balance - opened.coin_balance;
    if delta > 0 {
        ledger
            .credit(key, delta, TransactionKind::Work, None)
            .await
            .unwrap();
    } else if delta < 0 {
        ledger
            .debit(key, -delta, TransactionKind::Work, None)
            .await
            .unwrap();
    }
}

async fn assert_replay_holds(store: &InMemoryAccountStore, ledger: &Ledger) {
    assert!(ledger.audit(GuildId(GUILD)).await.unwrap().is_empty());
    let legs = store.all_transactions(GuildId(GUILD)).await.unwrap();
    for (key, replayed) in replay_balances(&legs) {
        let stored = store.get(key).await.unwrap().unwrap();
        assert_eq!(stored.coin_balance, replayed, "replay mismatch for {}", key);
    }
}

#[tokio::test]
async fn test_new_account_gets_starting_grant() {
    let (store, ledger) = setup();
    let account = ledger.balance(key(1)).await.unwrap();

    assert_eq!(account.coin_balance, 100);
    assert_eq!(account.revision, 1);
    let legs = store.transactions(key(1), 10).await.unwrap();
    assert_eq!(legs.len(), 1);
    assert_eq!(legs[0].kind, TransactionKind::Grant);
    assert_eq!(legs[0].from, None);
}

#[tokio::test]
async fn test_peek_does_not_open_account() {
    let (store, ledger) = setup();
    let seen = ledger.peek(key(9)).await.unwrap();
    assert_eq!(seen.coin_balance, 100);
    assert_eq!(store.account_count().await, 0);
    assert!(ledger.history(key(9), 25).await.unwrap().is_empty());

    fund(&ledger, key(9), 140).await;
    assert_eq!(ledger.peek(key(9)).await.unwrap().coin_balance, 140);
}

#[tokio::test]
async fn test_transfer_entire_balance() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 500).await;
    fund(&ledger, key(2), 100).await;

    let transfer = ledger
        .transfer(key(1), key(2), 500, Some("jazakallah".into()))
        .await
        .unwrap();

    assert_eq!(transfer.sender.coin_balance, 0);
    assert_eq!(transfer.receiver.coin_balance, 600);
    assert_eq!(transfer.debit.correlation_id, transfer.credit.correlation_id);
    assert!(transfer.debit.correlation_id.is_some());
    assert_eq!(transfer.debit.to, None);
    assert_eq!(transfer.credit.from, None);
    assert_replay_holds(&store, &ledger).await;
}

#[tokio::test]
async fn test_transfer_insufficient_funds_changes_nothing() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 499).await;
    fund(&ledger, key(2), 100).await;
    let legs_before = store.all_transactions(GuildId(GUILD)).await.unwrap().len();

    let err = ledger.transfer(key(1), key(2), 500, None).await.unwrap_err();
    assert_eq!(
        err.kind(),
        &EconomyErrorKind::InsufficientFunds {
            balance: 499,
            required: 500
        }
    );
    assert!(err.is_user_facing());

    assert_eq!(store.get(key(1)).await.unwrap().unwrap().coin_balance, 499);
    assert_eq!(store.get(key(2)).await.unwrap().unwrap().coin_balance, 100);
    assert_eq!(
        store.all_transactions(GuildId(GUILD)).await.unwrap().len(),
        legs_before
    );
}

#[tokio::test]
async fn test_transfer_validation() {
    let (_store, ledger) = setup();

    let err = ledger.transfer(key(1), key(1), 50, None).await.unwrap_err();
    assert_eq!(err.kind(), &EconomyErrorKind::SameAccount);

    for amount in [0, 9, 1001] {
        let err = ledger.transfer(key(1), key(2), amount, None).await.unwrap_err();
        assert!(matches!(err.kind(), EconomyErrorKind::InvalidAmount(_)));
    }

    let (_store, disabled) = setup_with(
        EconomyConfigBuilder::default()
            .transfer_enabled(false)
            .build()
            .unwrap(),
    );
    let err = disabled.transfer(key(1), key(2), 50, None).await.unwrap_err();
    assert_eq!(err.kind(), &EconomyErrorKind::TransfersDisabled);
}

#[tokio::test]
async fn test_credit_and_debit_reject_non_positive_amounts() {
    let (_store, ledger) = setup();
    for amount in [0, -5] {
        let err = ledger
            .credit(key(1), amount, TransactionKind::Work, None)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), EconomyErrorKind::InvalidAmount(_)));
        let err = ledger
            .debit(key(1), amount, TransactionKind::Work, None)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), EconomyErrorKind::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn test_concurrent_transfer_and_donate_exactly_one_wins() {
    for _ in 0..20 {
        let (store, ledger) = setup();
        fund(&ledger, key(1), 300).await;
        fund(&ledger, key(2), 100).await;

        let transfer = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.transfer(key(1), key(2), 300, None).await })
        };
        let donate = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.donate(key(1), 300, DonationCause::Charity).await })
        };
        let (transfer, donate) = (transfer.await.unwrap(), donate.await.unwrap());

        assert!(transfer.is_ok() != donate.is_ok(), "exactly one must succeed");
        let loser = transfer.err().or(donate.err()).unwrap();
        assert!(matches!(
            loser.kind(),
            EconomyErrorKind::InsufficientFunds { .. }
        ));
        assert_eq!(store.get(key(1)).await.unwrap().unwrap().coin_balance, 0);
        assert_replay_holds(&store, &ledger).await;
    }
}

#[tokio::test]
async fn test_donation_awards_points() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 1000).await;

    let donation = ledger
        .donate(key(1), 259, DonationCause::Education)
        .await
        .unwrap();

    assert_eq!(donation.points_awarded, 12);
    assert_eq!(donation.account.coin_balance, 741);
    assert_eq!(donation.account.good_deed_points, 12);
    assert_eq!(donation.account.total_donated, 259);
    assert_eq!(donation.transaction.note.as_deref(), Some("education"));

    let err = ledger
        .donate(key(1), 5, DonationCause::General)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), EconomyErrorKind::InvalidAmount(_)));
    assert_replay_holds(&store, &ledger).await;
}

#[tokio::test]
async fn test_purchase_updates_inventory_and_points() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 300).await;

    let purchase = ledger.purchase(key(1), "dua_book").await.unwrap();
    assert_eq!(purchase.account.coin_balance, 150);
    assert_eq!(purchase.account.good_deed_points, 5);
    assert_eq!(purchase.transaction.kind, TransactionKind::Purchase);

    ledger.purchase(key(1), "dua_book").await.unwrap();
    let inventory = ledger.inventory(key(1)).await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].quantity, 2);

    let err = ledger.purchase(key(1), "dua_book").await.unwrap_err();
    assert!(matches!(err.kind(), EconomyErrorKind::InsufficientFunds { .. }));

    let err = ledger.purchase(key(1), "flying_carpet").await.unwrap_err();
    assert_eq!(
        err.kind(),
        &EconomyErrorKind::UnknownItem("flying_carpet".to_string())
    );
    assert_replay_holds(&store, &ledger).await;
}

#[tokio::test]
async fn test_reset_sinks_balance_and_keeps_totals() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 250).await;
    ledger
        .donate(key(1), 100, DonationCause::General)
        .await
        .unwrap();

    let leg = ledger.reset(key(1)).await.unwrap().unwrap();
    assert_eq!(leg.kind, TransactionKind::Reset);
    assert_eq!(leg.amount, 150);

    let account = ledger.balance(key(1)).await.unwrap();
    assert_eq!(account.coin_balance, 0);
    assert_eq!(account.good_deed_points, 0);
    assert_eq!(account.total_donated, 100);
    assert!(ledger.reset(key(1)).await.unwrap().is_none());
    assert_replay_holds(&store, &ledger).await;
}

#[tokio::test]
async fn test_conflicts_are_retried() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 100).await;

    store.inject_conflicts(2);
    let leg = ledger
        .credit(key(1), 10, TransactionKind::Work, None)
        .await
        .unwrap();
    assert_eq!(leg.amount, 10);
    assert_eq!(ledger.balance(key(1)).await.unwrap().coin_balance, 110);
}

#[tokio::test]
async fn test_retry_exhaustion_reports_storage_unavailable() {
    let (store, ledger) = setup();
    fund(&ledger, key(1), 100).await;

    store.inject_conflicts(3);
    let err = ledger
        .credit(key(1), 10, TransactionKind::Work, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        EconomyErrorKind::StorageUnavailable(_)
    ));
    assert!(!err.is_user_facing());
    assert_eq!(ledger.balance(key(1)).await.unwrap().coin_balance, 100);
}

#[tokio::test]
async fn test_leaderboard_limit_is_clamped() {
    let (_store, ledger) = setup();
    for user in 1..=25 {
        fund(&ledger, key(user), 100 + user as i64).await;
    }

    let top = ledger
        .leaderboard(GuildId(GUILD), LeaderboardMetric::Coins, 100)
        .await
        .unwrap();
    assert_eq!(top.len(), 20);
    assert_eq!(top[0].user_id.get(), 25);

    let one = ledger
        .leaderboard(GuildId(GUILD), LeaderboardMetric::Coins, 0)
        .await
        .unwrap();
    assert_eq!(one.len(), 1);
}
