//! Reward engine integration tests: daily cycle, games, achievements.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use ilm_core::{
    AccountKey, AchievementCatalog, Difficulty, EconomyConfig, GameKind, GuildId, ShopCatalog,
    TransactionKind,
};
use ilm_economy::{EconomyErrorKind, Ledger, RewardEngine, daily_reward};
use ilm_storage::{AccountStore, InMemoryAccountStore};
use std::sync::Arc;

const GUILD: u64 = 7;

fn key(user: u64) -> AccountKey {
    AccountKey::new(GUILD, user)
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap()
}

fn setup() -> (Arc<InMemoryAccountStore>, RewardEngine) {
    let store = Arc::new(InMemoryAccountStore::new());
    let ledger = Arc::new(Ledger::new(
        store.clone(),
        EconomyConfig::default(),
        ShopCatalog::default(),
    ));
    (store, RewardEngine::new(ledger, AchievementCatalog::default()))
}

async fn daily_legs(store: &InMemoryAccountStore, user: u64) -> usize {
    store
        .transactions(key(user), 100)
        .await
        .unwrap()
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Daily)
        .count()
}

#[tokio::test]
async fn test_first_claim_starts_streak() {
    let (_store, rewards) = setup();
    let claim = rewards.claim_daily(key(1), start()).await.unwrap();

    assert_eq!(claim.streak, 1);
    assert_eq!(claim.reward, 60);
    assert_eq!(claim.weekly_bonus, 0);
    assert_eq!(claim.account.coin_balance, 160);
    assert_eq!(claim.account.last_daily_claim, Some(start()));
}

#[tokio::test]
async fn test_second_claim_within_cooldown_fails() {
    let (store, rewards) = setup();
    rewards.claim_daily(key(1), start()).await.unwrap();

    let later = start() + TimeDelta::hours(23) + TimeDelta::minutes(59);
    let err = rewards.claim_daily(key(1), later).await.unwrap_err();

    assert_eq!(
        err.kind(),
        &EconomyErrorKind::CooldownActive {
            available_at: start() + TimeDelta::hours(24)
        }
    );
    assert_eq!(daily_legs(&store, 1).await, 1);
}

#[tokio::test]
async fn test_claim_at_hour_25_continues_streak() {
    let (_store, rewards) = setup();
    rewards.claim_daily(key(1), start()).await.unwrap();

    let claim = rewards
        .claim_daily(key(1), start() + TimeDelta::hours(25))
        .await
        .unwrap();

    assert_eq!(claim.streak, 2);
    assert_eq!(
        claim.reward,
        daily_reward(rewards.ledger().config(), 2)
    );
    assert_eq!(claim.reward, 70);
}

#[tokio::test]
async fn test_streak_resets_after_grace_window() {
    let (_store, rewards) = setup();
    rewards.claim_daily(key(1), start()).await.unwrap();
    rewards
        .claim_daily(key(1), start() + TimeDelta::hours(25))
        .await
        .unwrap();

    let claim = rewards
        .claim_daily(key(1), start() + TimeDelta::hours(25 + 48))
        .await
        .unwrap();
    assert_eq!(claim.streak, 1);
    assert_eq!(claim.reward, 60);
}

#[tokio::test]
async fn test_weekly_bonus_on_seventh_day() {
    let (store, rewards) = setup();
    let mut last = None;
    for day in 0..7 {
        let now = start() + TimeDelta::hours(25 * day);
        last = Some(rewards.claim_daily(key(1), now).await.unwrap());
    }
    let seventh = last.unwrap();

    assert_eq!(seventh.streak, 7);
    assert_eq!(seventh.reward, 120);
    assert_eq!(seventh.weekly_bonus, 100);
    assert_eq!(seventh.transactions.len(), 2);
    // 60 + 70 + 80 + 90 + 100 + 110 + 120 + 100 on top of the grant
    assert_eq!(seventh.account.coin_balance, 100 + 630 + 100);
    assert_eq!(daily_legs(&store, 1).await, 8);
}

#[tokio::test]
async fn test_concurrent_claims_only_one_succeeds() {
    let (store, rewards) = setup();
    let rewards = Arc::new(rewards);
    // Open the account first so both claims race on the same revision
    rewards.ledger().balance(key(1)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let rewards = rewards.clone();
        handles.push(tokio::spawn(async move {
            rewards.claim_daily(key(1), start()).await
        }));
    }
    let results = futures::future::join_all(handles).await;
    let successes = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(daily_legs(&store, 1).await, 1);
}

#[tokio::test]
async fn test_game_reward_counts_games() {
    let (_store, rewards) = setup();
    let leg = rewards
        .reward_game(key(1), 25, "quiz", start())
        .await
        .unwrap();
    assert_eq!(leg.kind, TransactionKind::GameReward);
    assert_eq!(leg.note.as_deref(), Some("quiz"));

    let account = rewards.ledger().balance(key(1)).await.unwrap();
    assert_eq!(account.games_played, 1);
    assert_eq!(account.coin_balance, 125);
}

#[tokio::test]
async fn test_finished_game_pays_by_difficulty() {
    let (_store, rewards) = setup();
    let outcome = rewards
        .finish_game(key(1), GameKind::VerseMatch, Difficulty::Hard, true, start())
        .await
        .unwrap();
    assert_eq!(outcome.coins, 45);
    assert_eq!(outcome.account.coin_balance, 145);
    assert_eq!(outcome.account.games_played, 1);
    let leg = outcome.transaction.unwrap();
    assert_eq!(leg.kind, TransactionKind::GameReward);
    assert_eq!(leg.note.as_deref(), Some("hard verse_match"));
}

#[tokio::test]
async fn test_wrong_answer_counts_game_without_coins() {
    let (store, rewards) = setup();
    let outcome = rewards
        .finish_game(key(1), GameKind::Quiz, Difficulty::Easy, false, start())
        .await
        .unwrap();
    assert_eq!(outcome.coins, 0);
    assert!(outcome.transaction.is_none());
    assert_eq!(outcome.account.games_played, 1);
    assert_eq!(outcome.account.coin_balance, 100);

    let legs = store.transactions(key(1), 100).await.unwrap();
    assert!(legs.iter().all(|tx| tx.kind != TransactionKind::GameReward));

    let unlocked = rewards.check_achievements(key(1), start()).await.unwrap();
    assert_eq!(unlocked[0].id, "first_steps");
}

#[tokio::test]
async fn test_achievements_unlock_once_with_rewards() {
    let (store, rewards) = setup();
    assert!(rewards
        .check_achievements(key(1), start())
        .await
        .unwrap()
        .is_empty());

    rewards
        .reward_game(key(1), 10, "quiz", start())
        .await
        .unwrap();
    let unlocked = rewards.check_achievements(key(1), start()).await.unwrap();
    let ids: Vec<&str> = unlocked.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["first_steps"]);

    let account = rewards.ledger().balance(key(1)).await.unwrap();
    assert_eq!(account.coin_balance, 100 + 10 + 50);
    assert_eq!(account.good_deed_points, 5);

    assert!(rewards
        .check_achievements(key(1), start())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.achievements(key(1)).await.unwrap().len(), 1);
    assert!(rewards
        .ledger()
        .audit(GuildId(GUILD))
        .await
        .unwrap()
        .is_empty());
}
