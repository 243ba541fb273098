//! Cooldown and reward engine: daily claims, game payouts, achievements.

use crate::{EconomyError, EconomyErrorKind, EconomyResult, Ledger};
use chrono::{DateTime, Utc};
use ilm_core::{Account, AccountKey, Achievement, AchievementCatalog, IlmConfig, TransactionKind};
use ilm_core::{Difficulty, EconomyConfig, GameKind, GameRewardTable, Transaction};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of a successful daily claim.
#[derive(Debug, Clone)]
pub struct DailyClaim {
    /// Legs minted (the reward, plus the weekly bonus when earned)
    pub transactions: Vec<Transaction>,
    /// Capped base plus streak reward
    pub reward: i64,
    /// Weekly bonus, zero when not earned
    pub weekly_bonus: i64,
    /// Streak after this claim
    pub streak: i32,
    /// Account after the claim
    pub account: Account,
}

impl DailyClaim {
    /// Total coins minted by the claim.
    pub fn total(&self) -> i64 {
        self.reward + self.weekly_bonus
    }
}

/// Where an account stands in the daily cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyStatus {
    /// A claim would succeed now.
    Eligible,
    /// Claimed too recently.
    OnCooldown {
        /// Earliest time of the next claim
        available_at: DateTime<Utc>,
    },
}

/// Daily state of an account at `now`.
pub fn daily_status(config: &EconomyConfig, account: &Account, now: DateTime<Utc>) -> DailyStatus {
    match account.last_daily_claim {
        Some(last) if now - last < config.daily_cooldown() => DailyStatus::OnCooldown {
            available_at: last + config.daily_cooldown(),
        },
        _ => DailyStatus::Eligible,
    }
}

/// Streak an account reaches by claiming at `now`.
pub fn next_streak(config: &EconomyConfig, account: &Account, now: DateTime<Utc>) -> i32 {
    match account.last_daily_claim {
        Some(last) if now - last < config.streak_grace() => account.daily_streak.saturating_add(1),
        _ => 1,
    }
}

/// Daily reward for a streak, before the weekly bonus.
pub fn daily_reward(config: &EconomyConfig, streak: i32) -> i64 {
    (config.daily_base_reward() + config.streak_bonus(streak)).min(*config.max_daily_reward())
}

/// Weekly bonus earned at a streak.
pub fn weekly_bonus(config: &EconomyConfig, streak: i32) -> i64 {
    if streak > 0 && streak % 7 == 0 {
        *config.weekly_bonus()
    } else {
        0
    }
}

/// Result of a finished game.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    /// Coins paid, zero for a wrong answer
    pub coins: i64,
    /// Reward leg, absent when nothing was paid
    pub transaction: Option<Transaction>,
    /// Account after the game was recorded
    pub account: Account,
}

/// Reward engine built on top of the [`Ledger`].
#[derive(Debug, Clone)]
pub struct RewardEngine {
    ledger: Arc<Ledger>,
    achievements: AchievementCatalog,
    games: GameRewardTable,
}

impl RewardEngine {
    /// Create a reward engine.
    pub fn new(ledger: Arc<Ledger>, achievements: AchievementCatalog) -> Self {
        Self {
            ledger,
            achievements,
            games: GameRewardTable::default(),
        }
    }

    /// Replace the game reward table.
    pub fn with_games(mut self, games: GameRewardTable) -> Self {
        self.games = games;
        self
    }

    /// Create a reward engine from the bot configuration.
    pub fn from_config(ledger: Arc<Ledger>, config: &IlmConfig) -> Self {
        Self::new(ledger, config.achievements().clone()).with_games(config.games().clone())
    }

    /// The ledger rewards are minted through.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Achievement catalog.
    pub fn catalog(&self) -> &AchievementCatalog {
        &self.achievements
    }

    /// Game reward table.
    pub fn games(&self) -> &GameRewardTable {
        &self.games
    }

    /// Claim the daily reward.
    ///
    /// # Errors
    ///
    /// `CooldownActive` when the last claim is less than the cooldown ago; no
    /// leg is written in that case.
    #[instrument(skip(self), fields(%key))]
    pub async fn claim_daily(&self, key: AccountKey, now: DateTime<Utc>) -> EconomyResult<DailyClaim> {
        let mut settled = self
            .ledger
            .mutate(&[key], now, false, |batch| {
                let config = batch.config();
                let account = batch.account(key)?;
                if let DailyStatus::OnCooldown { available_at } =
                    daily_status(config, account, now)
                {
                    debug!(%available_at, "Daily reward on cooldown");
                    return Err(EconomyError::new(EconomyErrorKind::CooldownActive {
                        available_at,
                    }));
                }

                let streak = next_streak(config, account, now);
                let reward = daily_reward(config, streak);
                let bonus = weekly_bonus(config, streak);

                let mut legs = vec![batch.credit(
                    key,
                    reward,
                    TransactionKind::Daily,
                    Some(format!("streak {}", streak)),
                )?];
                if bonus > 0 {
                    legs.push(batch.credit(
                        key,
                        bonus,
                        TransactionKind::Daily,
                        Some("weekly bonus".to_string()),
                    )?);
                }
                batch.update(key, |account| {
                    account.daily_streak = streak;
                    account.last_daily_claim = Some(now);
                })?;
                Ok((legs, reward, bonus, streak))
            })
            .await?;

        let (transactions, reward, weekly_bonus, streak) = settled.value.clone();
        let claim = DailyClaim {
            transactions,
            reward,
            weekly_bonus,
            streak,
            account: settled.account(key)?,
        };
        info!(streak, total = claim.total(), "Daily reward claimed");
        Ok(claim)
    }

    /// Pay out a finished game.
    #[instrument(skip(self), fields(%key, amount, game))]
    pub async fn reward_game(
        &self,
        key: AccountKey,
        amount: i64,
        game: &str,
        now: DateTime<Utc>,
    ) -> EconomyResult<Transaction> {
        let settled = self
            .ledger
            .mutate(&[key], now, false, |batch| {
                let leg = batch.credit(
                    key,
                    amount,
                    TransactionKind::GameReward,
                    Some(game.to_string()),
                )?;
                batch.update(key, |account| account.games_played += 1)?;
                Ok(leg)
            })
            .await?;
        info!("Game reward paid");
        Ok(settled.value)
    }

    /// Record a finished game and pay for a correct answer.
    ///
    /// The game always counts towards `games_played`; coins come from the
    /// game reward table and are only paid when `correct` is set.
    #[instrument(skip(self), fields(%key, %kind, %difficulty, correct))]
    pub async fn finish_game(
        &self,
        key: AccountKey,
        kind: GameKind,
        difficulty: Difficulty,
        correct: bool,
        now: DateTime<Utc>,
    ) -> EconomyResult<GameOutcome> {
        let coins = if correct {
            self.games.coins(kind, difficulty)
        } else {
            0
        };

        let mut settled = self
            .ledger
            .mutate(&[key], now, false, |batch| {
                let leg = if coins > 0 {
                    Some(batch.credit(
                        key,
                        coins,
                        TransactionKind::GameReward,
                        Some(format!("{} {}", difficulty, kind)),
                    )?)
                } else {
                    None
                };
                batch.update(key, |account| account.games_played += 1)?;
                Ok(leg)
            })
            .await?;

        info!(coins, "Game recorded");
        Ok(GameOutcome {
            coins,
            transaction: settled.value.clone(),
            account: settled.account(key)?,
        })
    }

    /// Unlock every achievement the account newly qualifies for and pay its
    /// rewards, all in one commit.
    #[instrument(skip(self), fields(%key))]
    pub async fn check_achievements(
        &self,
        key: AccountKey,
        now: DateTime<Utc>,
    ) -> EconomyResult<Vec<Achievement>> {
        let settled = self
            .ledger
            .mutate(&[key], now, true, |batch| {
                let (account, distinct_items, unlocked) = {
                    let holdings = batch.holdings(key).cloned().unwrap_or_default();
                    (
                        batch.account(key)?.clone(),
                        holdings.distinct_items(),
                        holdings.unlocked,
                    )
                };

                let earned: Vec<Achievement> = self
                    .achievements
                    .achievements
                    .iter()
                    .filter(|a| !unlocked.contains(&a.id) && a.is_met(&account, distinct_items))
                    .cloned()
                    .collect();

                for achievement in &earned {
                    batch.unlock(key, &achievement.id);
                    if achievement.reward_coins > 0 {
                        batch.credit(
                            key,
                            achievement.reward_coins,
                            TransactionKind::Achievement,
                            Some(achievement.id.clone()),
                        )?;
                    }
                    batch.award_points(key, achievement.reward_points)?;
                }
                Ok(earned)
            })
            .await?;

        if !settled.value.is_empty() {
            info!(count = settled.value.len(), "Achievements unlocked");
        }
        Ok(settled.value)
    }
}
