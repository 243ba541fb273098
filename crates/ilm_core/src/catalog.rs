//! Shop and achievement catalogs.
//!
//! Both catalogs are static configuration: they ship with sensible defaults
//! and can be replaced wholesale from the TOML config file.

use crate::Account;
use serde::{Deserialize, Serialize};

/// Shop section grouping.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemCategory {
    /// Books, courses, recitations
    Knowledge,
    /// Decorations
    Cosmetic,
    /// Everyday items
    Practical,
    /// Certificates and recognition
    Prestige,
    /// Boosts
    Utility,
}

/// A purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Stable id used by `/buy`
    pub id: String,
    /// Display name
    pub name: String,
    /// Display description
    pub description: String,
    /// Price in coins
    pub price: i64,
    /// Shop section
    pub category: ItemCategory,
    /// Good deed points granted on purchase
    #[serde(default)]
    pub good_deed_points: i64,
    /// Prestige shown on the item card
    #[serde(default)]
    pub prestige: i64,
}

impl ShopItem {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        price: i64,
        category: ItemCategory,
        good_deed_points: i64,
        prestige: i64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            category,
            good_deed_points,
            prestige,
        }
    }
}

/// The shop's item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopCatalog {
    /// Items in display order
    #[serde(default)]
    pub items: Vec<ShopItem>,
}

impl ShopCatalog {
    /// Look an item up by id.
    pub fn get(&self, id: &str) -> Option<&ShopItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items in a category, or all items.
    pub fn in_category(&self, category: Option<ItemCategory>) -> Vec<&ShopItem> {
        self.items
            .iter()
            .filter(|item| category.is_none_or(|c| item.category == c))
            .collect()
    }
}

impl Default for ShopCatalog {
    fn default() -> Self {
        use ItemCategory::*;
        Self {
            items: vec![
                ShopItem::new(
                    "dua_book",
                    "Dua Collection Book",
                    "A comprehensive collection of prayers and supplications",
                    150,
                    Knowledge,
                    5,
                    0,
                ),
                ShopItem::new(
                    "quran_audio",
                    "Quran Audio Recitation",
                    "Recitation of the Holy Quran by renowned Qaris",
                    200,
                    Knowledge,
                    8,
                    0,
                ),
                ShopItem::new(
                    "islamic_art",
                    "Islamic Art Frame",
                    "Calligraphy and geometric patterns",
                    300,
                    Cosmetic,
                    0,
                    10,
                ),
                ShopItem::new(
                    "prayer_mat",
                    "Premium Prayer Mat",
                    "High-quality prayer mat with comfortable padding",
                    400,
                    Practical,
                    15,
                    0,
                ),
                ShopItem::new(
                    "charity_certificate",
                    "Charity Certificate",
                    "Certificate recognizing your charitable contributions",
                    500,
                    Prestige,
                    20,
                    25,
                ),
                ShopItem::new(
                    "hijri_calendar",
                    "Hijri Calendar",
                    "Islamic calendar with important dates and events",
                    250,
                    Knowledge,
                    10,
                    0,
                ),
                ShopItem::new(
                    "arabic_lessons",
                    "Arabic Language Course",
                    "Basic Arabic lessons for Quranic understanding",
                    600,
                    Knowledge,
                    30,
                    15,
                ),
            ],
        }
    }
}

/// Statistic an achievement is measured on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AchievementMetric {
    /// Current coin balance
    CoinBalance,
    /// Good deed points
    GoodDeedPoints,
    /// Lifetime coins earned
    TotalEarned,
    /// Lifetime coins donated
    TotalDonated,
    /// Current daily streak
    DailyStreak,
    /// Games that paid out
    GamesPlayed,
    /// Number of different shop items owned
    DistinctItems,
}

impl AchievementMetric {
    /// Current value of the metric for an account.
    pub fn measure(self, account: &Account, distinct_items: usize) -> i64 {
        match self {
            Self::CoinBalance => account.coin_balance,
            Self::GoodDeedPoints => account.good_deed_points,
            Self::TotalEarned => account.total_earned,
            Self::TotalDonated => account.total_donated,
            Self::DailyStreak => i64::from(account.daily_streak),
            Self::GamesPlayed => i64::from(account.games_played),
            Self::DistinctItems => distinct_items as i64,
        }
    }
}

/// A milestone with a one-time reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Stable id
    pub id: String,
    /// Display name
    pub name: String,
    /// What it takes
    pub description: String,
    /// Measured statistic
    pub metric: AchievementMetric,
    /// Minimum value that unlocks it
    pub threshold: i64,
    /// Coins minted on unlock
    #[serde(default)]
    pub reward_coins: i64,
    /// Good deed points granted on unlock
    #[serde(default)]
    pub reward_points: i64,
}

impl Achievement {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        metric: AchievementMetric,
        threshold: i64,
        reward_coins: i64,
        reward_points: i64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            metric,
            threshold,
            reward_coins,
            reward_points,
        }
    }

    /// Whether the account meets the threshold.
    pub fn is_met(&self, account: &Account, distinct_items: usize) -> bool {
        self.metric.measure(account, distinct_items) >= self.threshold
    }
}

/// Every achievement the bot knows about.
///
/// Serialized as a bare array so the config file can use `[[achievements]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementCatalog {
    /// Achievements in display order
    pub achievements: Vec<Achievement>,
}

impl AchievementCatalog {
    /// Look an achievement up by id.
    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }
}

impl Default for AchievementCatalog {
    fn default() -> Self {
        use AchievementMetric::*;
        Self {
            achievements: vec![
                Achievement::new(
                    "first_steps",
                    "First Steps",
                    "Finish your first game",
                    GamesPlayed,
                    1,
                    50,
                    5,
                ),
                Achievement::new(
                    "generous_soul",
                    "Generous Soul",
                    "Donate 1000 Ilm Coins to charity",
                    TotalDonated,
                    1000,
                    500,
                    50,
                ),
                Achievement::new(
                    "daily_devotee",
                    "Daily Devotee",
                    "Maintain a 7-day daily reward streak",
                    DailyStreak,
                    7,
                    300,
                    25,
                ),
                Achievement::new(
                    "knowledge_seeker",
                    "Knowledge Seeker",
                    "Complete 25 games",
                    GamesPlayed,
                    25,
                    400,
                    30,
                ),
                Achievement::new(
                    "community_pillar",
                    "Community Pillar",
                    "Reach 100 Good Deed Points",
                    GoodDeedPoints,
                    100,
                    600,
                    50,
                ),
                Achievement::new(
                    "wealth_of_knowledge",
                    "Wealth of Knowledge",
                    "Earn 5000 total Ilm Coins",
                    TotalEarned,
                    5000,
                    1000,
                    75,
                ),
                Achievement::new(
                    "islamic_artisan",
                    "Islamic Artisan",
                    "Own 5 different shop items",
                    DistinctItems,
                    5,
                    450,
                    40,
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccountKey;
    use chrono::Utc;

    #[test]
    fn test_default_shop_filters_by_category() {
        let shop = ShopCatalog::default();
        let knowledge = shop.in_category(Some(ItemCategory::Knowledge));
        assert!(knowledge.iter().all(|i| i.category == ItemCategory::Knowledge));
        assert_eq!(shop.in_category(None).len(), shop.items.len());
        assert_eq!(shop.get("prayer_mat").map(|i| i.price), Some(400));
    }

    #[test]
    fn test_distinct_items_metric() {
        let account = Account::new(AccountKey::new(1u64, 2u64), Utc::now());
        let catalog = AchievementCatalog::default();
        let artisan = catalog.get("islamic_artisan").expect("default achievement");
        assert!(!artisan.is_met(&account, 4));
        assert!(artisan.is_met(&account, 5));
    }
}
