//! Game kinds and the coin table that pays for them.

use crate::config::ConfigResult;
use derive_getters::Getters;
use ilm_error::ConfigError;
use serde::{Deserialize, Serialize};

/// Educational games that pay rewards.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameKind {
    /// Multiple choice Islamic knowledge quiz
    Quiz,
    /// Match a verse to its surah
    VerseMatch,
    /// Hadith trivia
    HadithTrivia,
}

/// Question difficulty.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum Difficulty {
    /// Easy
    Easy,
    /// Medium
    #[default]
    Medium,
    /// Hard
    Hard,
}

/// Base coins per game and the difficulty multipliers applied to them.
///
/// Multipliers are whole percentages so payouts stay integral:
/// `coins = base * percent / 100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct GameRewardTable {
    /// Base coins for a correct quiz answer.
    quiz: i64,
    /// Base coins for a correct verse match.
    verse_match: i64,
    /// Base coins for a correct hadith trivia answer.
    hadith_trivia: i64,
    /// Multiplier for easy questions.
    easy_percent: i64,
    /// Multiplier for medium questions.
    medium_percent: i64,
    /// Multiplier for hard questions.
    hard_percent: i64,
}

impl Default for GameRewardTable {
    fn default() -> Self {
        Self {
            quiz: 25,
            verse_match: 30,
            hadith_trivia: 20,
            easy_percent: 70,
            medium_percent: 100,
            hard_percent: 150,
        }
    }
}

impl GameRewardTable {
    /// Base coins for a game before the difficulty multiplier.
    pub fn base(&self, kind: GameKind) -> i64 {
        match kind {
            GameKind::Quiz => self.quiz,
            GameKind::VerseMatch => self.verse_match,
            GameKind::HadithTrivia => self.hadith_trivia,
        }
    }

    /// Difficulty multiplier in percent.
    pub fn percent(&self, difficulty: Difficulty) -> i64 {
        match difficulty {
            Difficulty::Easy => self.easy_percent,
            Difficulty::Medium => self.medium_percent,
            Difficulty::Hard => self.hard_percent,
        }
    }

    /// Coins paid for a correct answer.
    pub fn coins(&self, kind: GameKind, difficulty: Difficulty) -> i64 {
        self.base(kind) * self.percent(difficulty) / 100
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        let fields = [
            ("games.quiz", self.quiz),
            ("games.verse_match", self.verse_match),
            ("games.hadith_trivia", self.hadith_trivia),
            ("games.easy_percent", self.easy_percent),
            ("games.medium_percent", self.medium_percent),
            ("games.hard_percent", self.hard_percent),
        ];
        for (key, value) in fields {
            if value < 0 {
                return Err(ConfigError::invalid(key, "cannot be negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payouts() {
        let table = GameRewardTable::default();
        assert_eq!(table.coins(GameKind::Quiz, Difficulty::Medium), 25);
        assert_eq!(table.coins(GameKind::Quiz, Difficulty::Easy), 17);
        assert_eq!(table.coins(GameKind::Quiz, Difficulty::Hard), 37);
        assert_eq!(table.coins(GameKind::VerseMatch, Difficulty::Hard), 45);
        assert_eq!(table.coins(GameKind::HadithTrivia, Difficulty::Easy), 14);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(GameKind::VerseMatch.to_string(), "verse_match");
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
    }

    #[test]
    fn test_negative_base_rejected() {
        let table: GameRewardTable = toml::from_str("quiz = -5").unwrap();
        assert!(table.validate().is_err());
        assert_eq!(*table.verse_match(), 30);
    }
}
