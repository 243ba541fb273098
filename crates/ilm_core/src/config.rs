//! Bot configuration types and loading.
//!
//! The configuration is loaded once at startup and handed to each engine as
//! an immutable value. Secrets (bot token, database URL) are read from the
//! environment by the binary and never live in this file.

use crate::{AchievementCatalog, GameRewardTable, RoleId, ShopCatalog};
use chrono::TimeDelta;
use derive_builder::Builder;
use derive_getters::Getters;
use ilm_error::{ConfigError, ConfigErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which verified role a verification grants.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Female verification
    Female,
    /// Male verification
    Male,
}

/// Economy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Builder)]
#[builder(default)]
#[serde(default)]
pub struct EconomyConfig {
    /// Coins minted into a freshly created account.
    starting_balance: i64,
    /// Whether `/transfer` is enabled.
    transfer_enabled: bool,
    /// Smallest transfer.
    min_transfer: i64,
    /// Largest transfer.
    max_transfer: i64,
    /// Smallest donation.
    min_donation: i64,
    /// Largest donation.
    max_donation: i64,
    /// Coins donated per good deed point awarded.
    donation_coins_per_point: i64,
    /// Daily reward before streak bonus.
    daily_base_reward: i64,
    /// Bonus per streak day.
    daily_streak_bonus: i64,
    /// Streak days that count towards the bonus.
    max_streak_days: i32,
    /// Cap on base plus streak bonus.
    max_daily_reward: i64,
    /// Extra coins every seventh consecutive claim (0 disables).
    weekly_bonus: i64,
    /// Hours between daily claims.
    daily_cooldown_hours: i64,
    /// Hours after the last claim within which the streak continues.
    streak_grace_hours: i64,
    /// Attempts at committing a mutation before reporting the store unavailable.
    max_commit_attempts: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: 100,
            transfer_enabled: true,
            min_transfer: 10,
            max_transfer: 1000,
            min_donation: 10,
            max_donation: 10_000,
            donation_coins_per_point: 20,
            daily_base_reward: 50,
            daily_streak_bonus: 10,
            max_streak_days: 7,
            max_daily_reward: 120,
            weekly_bonus: 100,
            daily_cooldown_hours: 24,
            streak_grace_hours: 48,
            max_commit_attempts: 3,
        }
    }
}

impl EconomyConfig {
    /// Minimum time between two daily claims.
    pub fn daily_cooldown(&self) -> TimeDelta {
        TimeDelta::hours(self.daily_cooldown_hours)
    }

    /// Window after the last claim in which the streak continues.
    pub fn streak_grace(&self) -> TimeDelta {
        TimeDelta::hours(self.streak_grace_hours)
    }

    /// Streak component of the daily reward.
    pub fn streak_bonus(&self, streak: i32) -> i64 {
        i64::from(streak.clamp(0, self.max_streak_days)) * self.daily_streak_bonus
    }

    /// Good deed points a donation earns.
    pub fn points_for_donation(&self, amount: i64) -> i64 {
        amount / self.donation_coins_per_point
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.starting_balance < 0 {
            return Err(ConfigError::invalid("economy.starting_balance", "cannot be negative"));
        }
        check_bounds("transfer", self.min_transfer, self.max_transfer)?;
        check_bounds("donation", self.min_donation, self.max_donation)?;
        if self.donation_coins_per_point <= 0 {
            return Err(ConfigError::invalid("economy.donation_coins_per_point", "must be positive"));
        }
        if self.daily_base_reward < 0 || self.daily_streak_bonus < 0 || self.weekly_bonus < 0 {
            return Err(ConfigError::invalid("economy.daily_base_reward", "daily reward constants cannot be negative"));
        }
        if self.max_daily_reward < self.daily_base_reward {
            return Err(ConfigError::invalid("economy.max_daily_reward", "must be at least daily_base_reward"));
        }
        if self.daily_cooldown_hours <= 0 || self.streak_grace_hours < self.daily_cooldown_hours {
            return Err(ConfigError::invalid(
                "economy.streak_grace_hours",
                "must be at least the positive daily_cooldown_hours",
            ));
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::invalid("economy.max_commit_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_bounds(what: &str, min: i64, max: i64) -> ConfigResult<()> {
    if min <= 0 || min > max {
        return Err(ConfigError::invalid(
            format!("economy.min_{}", what),
            format!("bounds must satisfy 0 < min <= max (got {}..={})", min, max),
        ));
    }
    Ok(())
}

/// Logical role names used by one verification direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct VerificationBinding {
    /// Role an actor needs to run the command.
    verifier_role: String,
    /// Role granted to the target.
    destination_role: String,
    /// Role removed from the target when present.
    #[serde(default)]
    unverified_role: Option<String>,
}

impl VerificationBinding {
    /// Bind logical role names.
    pub fn new(
        verifier_role: impl Into<String>,
        destination_role: impl Into<String>,
        unverified_role: Option<String>,
    ) -> Self {
        Self {
            verifier_role: verifier_role.into(),
            destination_role: destination_role.into(),
            unverified_role,
        }
    }
}

/// A [`VerificationBinding`] with names resolved to platform ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// Role an actor needs to run the command.
    pub verifier: RoleId,
    /// Role granted to the target.
    pub destination: RoleId,
    /// Role removed from the target when present.
    pub unverified: Option<RoleId>,
}

/// Persistence backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store, lost on exit.
    #[default]
    Memory,
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use.
    backend: StorageBackend,
    /// Connection pool size for database backends.
    pool_size: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            pool_size: 10,
        }
    }
}

/// Complete bot configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, Builder)]
#[builder(setter(into))]
pub struct IlmConfig {
    /// Economy constants.
    #[builder(default)]
    #[serde(default)]
    economy: EconomyConfig,
    /// Logical role name to platform role id.
    #[builder(default)]
    #[serde(default)]
    roles: BTreeMap<String, RoleId>,
    /// Per-direction role bindings.
    #[builder(default)]
    #[serde(default)]
    verification: BTreeMap<Direction, VerificationBinding>,
    /// Shop items.
    #[builder(default)]
    #[serde(default)]
    shop: ShopCatalog,
    /// Achievements.
    #[builder(default)]
    #[serde(default)]
    achievements: AchievementCatalog,
    /// Coins paid by educational games.
    #[builder(default)]
    #[serde(default)]
    games: GameRewardTable,
    /// Persistence settings.
    #[builder(default)]
    #[serde(default)]
    storage: StorageConfig,
}

impl IlmConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading bot config from file");

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        let config: IlmConfig = toml::from_str(contents)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())))?;

        config.validate()?;

        tracing::info!(
            roles = config.roles.len(),
            directions = config.verification.len(),
            shop_items = config.shop.items.len(),
            achievements = config.achievements.achievements.len(),
            "Loaded bot configuration"
        );

        Ok(config)
    }

    /// Resolve a logical role name to its platform id.
    pub fn role(&self, name: &str) -> ConfigResult<RoleId> {
        self.roles
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::new(ConfigErrorKind::UnknownRole(name.to_string())))
    }

    /// Resolve the role ids bound to a verification direction.
    pub fn binding(&self, direction: Direction) -> ConfigResult<ResolvedBinding> {
        let binding = self.verification.get(&direction).ok_or_else(|| {
            ConfigError::new(ConfigErrorKind::UnboundDirection(direction.to_string()))
        })?;

        Ok(ResolvedBinding {
            verifier: self.role(&binding.verifier_role)?,
            destination: self.role(&binding.destination_role)?,
            unverified: binding
                .unverified_role
                .as_deref()
                .map(|name| self.role(name))
                .transpose()?,
        })
    }

    /// Check the whole configuration for consistency.
    pub fn validate(&self) -> ConfigResult<()> {
        self.economy.validate()?;
        self.games.validate()?;

        for (name, id) in &self.roles {
            if id.get() == 0 {
                return Err(ConfigError::invalid(format!("roles.{}", name), "role id cannot be 0"));
            }
        }

        for direction in self.verification.keys() {
            self.binding(*direction)?;
        }

        let mut seen = HashSet::new();
        for item in &self.shop.items {
            if item.price <= 0 {
                return Err(ConfigError::invalid(
                    format!("shop.items.{}.price", item.id),
                    "must be positive",
                ));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(ConfigError::new(ConfigErrorKind::DuplicateId {
                    catalog: "shop".to_string(),
                    id: item.id.clone(),
                }));
            }
        }

        let mut seen = HashSet::new();
        for achievement in &self.achievements.achievements {
            if !seen.insert(achievement.id.as_str()) {
                return Err(ConfigError::new(ConfigErrorKind::DuplicateId {
                    catalog: "achievements".to_string(),
                    id: achievement.id.clone(),
                }));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Difficulty, GameKind};

    const SAMPLE: &str = r#"
[economy]
starting_balance = 50
max_transfer = 500

[roles]
female_verifier = 1438678339786244096
male_verifier = 1438678549358706781
female = 1438734916929196054
male = 1438734872670769323
female_unverified = 1438758944322355200
male_unverified = 1438734829192740955

[verification.female]
verifier_role = "female_verifier"
destination_role = "female"
unverified_role = "female_unverified"

[verification.male]
verifier_role = "male_verifier"
destination_role = "male"
unverified_role = "male_unverified"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = IlmConfig::from_toml(SAMPLE).expect("valid config");
        assert_eq!(*config.economy().starting_balance(), 50);
        assert_eq!(*config.economy().max_transfer(), 500);
        // Unset fields keep their defaults
        assert_eq!(*config.economy().min_transfer(), 10);
        assert_eq!(config.shop().items.len(), ShopCatalog::default().items.len());

        let female = config.binding(Direction::Female).expect("female binding");
        assert_eq!(female.destination, RoleId(1438734916929196054));
        assert_eq!(female.unverified, Some(RoleId(1438758944322355200)));
    }

    #[test]
    fn test_unknown_role_name_rejected() {
        let broken = SAMPLE.replace("destination_role = \"male\"", "destination_role = \"men\"");
        let err = IlmConfig::from_toml(&broken).unwrap_err();
        assert_eq!(err.kind(), &ConfigErrorKind::UnknownRole("men".to_string()));
    }

    #[test]
    fn test_inverted_transfer_bounds_rejected() {
        let config = IlmConfigBuilder::default()
            .economy(
                EconomyConfigBuilder::default()
                    .min_transfer(100)
                    .max_transfer(10)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_streak_bonus_is_capped() {
        let economy = EconomyConfig::default();
        assert_eq!(economy.streak_bonus(2), 20);
        assert_eq!(economy.streak_bonus(30), 70);
        assert_eq!(economy.points_for_donation(59), 2);
    }

    #[test]
    fn test_game_table_overrides() {
        let text = format!("{}\n[games]\nquiz = 40\nhard_percent = 200\n", SAMPLE);
        let config = IlmConfig::from_toml(&text).expect("valid config");
        assert_eq!(config.games().coins(GameKind::Quiz, Difficulty::Hard), 80);
        assert_eq!(config.games().coins(GameKind::VerseMatch, Difficulty::Medium), 30);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ilm.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert!(IlmConfig::from_file(&path).is_ok());
        assert!(IlmConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
