//! Membership records owned by an account, and leaderboard rows.

use crate::{Account, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shop item held by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Catalog item id
    pub item_id: String,
    /// How many were bought
    pub quantity: i32,
    /// First acquisition time
    pub acquired_at: DateTime<Utc>,
}

/// An achievement unlocked by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    /// Catalog achievement id
    pub achievement_id: String,
    /// When it was unlocked
    pub unlocked_at: DateTime<Utc>,
}

/// Ranking column for the guild leaderboard.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
pub enum LeaderboardMetric {
    /// Current coin balance
    #[default]
    #[strum(serialize = "coins")]
    Coins,
    /// Good deed points
    #[strum(serialize = "gdp")]
    GoodDeedPoints,
    /// Lifetime coins earned
    #[strum(serialize = "earned")]
    TotalEarned,
}

impl LeaderboardMetric {
    /// Read the ranked value off an account.
    pub fn value(self, account: &Account) -> i64 {
        match self {
            Self::Coins => account.coin_balance,
            Self::GoodDeedPoints => account.good_deed_points,
            Self::TotalEarned => account.total_earned,
        }
    }

    /// Human label used in replies.
    pub fn label(self) -> &'static str {
        match self {
            Self::Coins => "Ilm Coins",
            Self::GoodDeedPoints => "Good Deed Points",
            Self::TotalEarned => "Total Earned",
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Ranked user
    pub user_id: UserId,
    /// Value of the ranked metric
    pub value: i64,
}
