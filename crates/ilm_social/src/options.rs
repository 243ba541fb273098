//! Typed option schema for slash commands.
//!
//! Every command declares its options up front; requests are validated against
//! the schema before any engine runs, so handlers only ever see well-typed,
//! in-range values.

use crate::quiz::ANSWER_LETTERS;
use crate::{RouterError, RouterErrorKind, RouterResult};
use ilm_core::EconomyConfig;
use ilm_roles::MemberSnapshot;
use std::collections::HashMap;

/// A resolved option value as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Whole number
    Integer(i64),
    /// Free text or a choice
    String(String),
    /// A guild member
    User(MemberSnapshot),
}

impl OptionValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::User(_) => "user",
        }
    }
}

/// Expected type and constraints of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    /// Integer within inclusive bounds
    Integer {
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
    /// Text, optionally restricted to fixed choices
    String {
        /// Accepted values, `None` for free text
        choices: Option<Vec<&'static str>>,
    },
    /// A member of the guild
    User,
}

/// One declared option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Option name
    pub name: &'static str,
    /// Expected type
    pub kind: OptionKind,
    /// Whether the option must be present
    pub required: bool,
}

impl OptionSpec {
    fn integer(name: &'static str, min: i64, max: i64) -> Self {
        Self {
            name,
            kind: OptionKind::Integer { min, max },
            required: false,
        }
    }

    fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: OptionKind::String { choices: None },
            required: false,
        }
    }

    fn choice(name: &'static str, choices: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            name,
            kind: OptionKind::String {
                choices: Some(choices.into_iter().collect()),
            },
            required: false,
        }
    }

    fn user(name: &'static str) -> Self {
        Self {
            name,
            kind: OptionKind::User,
            required: false,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn check(&self, command: &str, value: &OptionValue) -> RouterResult<()> {
        let invalid = |reason: String| {
            RouterError::new(RouterErrorKind::InvalidOption {
                command: command.to_string(),
                option: self.name.to_string(),
                reason,
            })
        };

        match (&self.kind, value) {
            (OptionKind::Integer { min, max }, OptionValue::Integer(n)) => {
                if n < min || n > max {
                    return Err(invalid(format!("must be between {} and {}", min, max)));
                }
            }
            (OptionKind::String { choices }, OptionValue::String(s)) => {
                if let Some(choices) = choices {
                    if !choices.contains(&s.as_str()) {
                        return Err(invalid(format!("must be one of {}", choices.join(", "))));
                    }
                }
            }
            (OptionKind::User, OptionValue::User(_)) => {}
            (expected, got) => {
                return Err(invalid(format!(
                    "expected {}, got {}",
                    kind_name(expected),
                    got.type_name()
                )));
            }
        }
        Ok(())
    }
}

fn kind_name(kind: &OptionKind) -> &'static str {
    match kind {
        OptionKind::Integer { .. } => "integer",
        OptionKind::String { .. } => "string",
        OptionKind::User => "user",
    }
}

/// A command and its declared options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command name without the slash
    pub name: &'static str,
    /// One-line help text
    pub description: &'static str,
    /// Declared options
    pub options: Vec<OptionSpec>,
}

impl CommandSpec {
    fn new(name: &'static str, description: &'static str, options: Vec<OptionSpec>) -> Self {
        Self {
            name,
            description,
            options,
        }
    }

    /// Validate raw options against the declaration.
    ///
    /// # Errors
    ///
    /// `MissingOption` for an absent required option, `InvalidOption` for a
    /// wrong type, out-of-range value, unknown choice or undeclared option.
    pub fn validate(&self, raw: &HashMap<String, OptionValue>) -> RouterResult<ParsedOptions> {
        for name in raw.keys() {
            if !self.options.iter().any(|o| o.name == name.as_str()) {
                return Err(RouterError::new(RouterErrorKind::InvalidOption {
                    command: self.name.to_string(),
                    option: name.clone(),
                    reason: "unknown option".to_string(),
                }));
            }
        }

        let mut values = HashMap::new();
        for spec in &self.options {
            match raw.get(spec.name) {
                Some(value) => {
                    spec.check(self.name, value)?;
                    values.insert(spec.name, value.clone());
                }
                None if spec.required => {
                    return Err(RouterError::new(RouterErrorKind::MissingOption {
                        command: self.name.to_string(),
                        option: spec.name.to_string(),
                    }));
                }
                None => {}
            }
        }
        Ok(ParsedOptions { values })
    }
}

/// Options that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    values: HashMap<&'static str, OptionValue>,
}

impl ParsedOptions {
    /// Integer option, if present.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(OptionValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// String option, if present.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// User option, if present.
    pub fn user(&self, name: &str) -> Option<&MemberSnapshot> {
        match self.values.get(name) {
            Some(OptionValue::User(member)) => Some(member),
            _ => None,
        }
    }
}

/// Largest `/history` page.
pub const MAX_HISTORY: i64 = 25;

/// Every command the router understands.
#[derive(Debug, Clone)]
pub struct CommandSchema {
    commands: Vec<CommandSpec>,
}

impl CommandSchema {
    /// Build the schema with bounds taken from the economy configuration.
    pub fn new(economy: &EconomyConfig) -> Self {
        let leaderboard_limit = ilm_economy::MAX_LEADERBOARD as i64;
        let commands = vec![
            CommandSpec::new(
                "balance",
                "Check your or another member's Ilm Coins",
                vec![OptionSpec::user("user")],
            ),
            CommandSpec::new("daily", "Claim your daily Ilm Coins", vec![]),
            CommandSpec::new(
                "transfer",
                "Send Ilm Coins to another member",
                vec![
                    OptionSpec::user("user").required(),
                    OptionSpec::integer(
                        "amount",
                        *economy.min_transfer(),
                        *economy.max_transfer(),
                    )
                    .required(),
                    OptionSpec::text("message"),
                ],
            ),
            CommandSpec::new(
                "donate",
                "Donate Ilm Coins for Good Deed Points",
                vec![
                    OptionSpec::integer(
                        "amount",
                        *economy.min_donation(),
                        *economy.max_donation(),
                    )
                    .required(),
                    OptionSpec::choice("cause", ["general", "education", "charity", "community"]),
                ],
            ),
            CommandSpec::new(
                "leaderboard",
                "Show the top members of this server",
                vec![
                    OptionSpec::choice("type", ["coins", "gdp", "earned"]),
                    OptionSpec::integer("limit", 1, leaderboard_limit),
                ],
            ),
            CommandSpec::new(
                "shop",
                "Browse the Islamic shop",
                vec![OptionSpec::choice(
                    "category",
                    ["knowledge", "cosmetic", "practical", "prestige", "utility"],
                )],
            ),
            CommandSpec::new(
                "buy",
                "Buy an item from the shop",
                vec![OptionSpec::text("item_id").required()],
            ),
            CommandSpec::new("inventory", "Show the items you own", vec![]),
            CommandSpec::new("achievements", "Show your achievements", vec![]),
            CommandSpec::new(
                "history",
                "Show your recent transactions",
                vec![OptionSpec::integer("limit", 1, MAX_HISTORY)],
            ),
            CommandSpec::new(
                "quiz",
                "Answer an Islamic knowledge question for Ilm Coins",
                vec![
                    OptionSpec::choice(
                        "category",
                        ["quran", "hadith", "prophets", "prayer", "calendar"],
                    ),
                    OptionSpec::choice("difficulty", ["easy", "medium", "hard"]),
                ],
            ),
            CommandSpec::new(
                "answer",
                "Answer your open quiz question",
                vec![OptionSpec::choice("choice", ANSWER_LETTERS).required()],
            ),
            CommandSpec::new(
                "verify_female",
                "Verify a user as female",
                vec![OptionSpec::user("user").required()],
            ),
            CommandSpec::new(
                "verify_male",
                "Verify a user as male",
                vec![OptionSpec::user("user").required()],
            ),
        ];
        Self { commands }
    }

    /// Look a command up by name.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// All commands in declaration order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: Vec<(&str, OptionValue)>) -> HashMap<String, OptionValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn schema() -> CommandSchema {
        CommandSchema::new(&EconomyConfig::default())
    }

    #[test]
    fn test_transfer_amount_bounds_come_from_config() {
        let schema = schema();
        let transfer = schema.get("transfer").unwrap();
        let target = OptionValue::User(MemberSnapshot::new(2u64, "Bilal", []));

        let ok = transfer
            .validate(&raw(vec![
                ("user", target.clone()),
                ("amount", OptionValue::Integer(1000)),
            ]))
            .unwrap();
        assert_eq!(ok.integer("amount"), Some(1000));
        assert_eq!(ok.string("message"), None);

        let err = transfer
            .validate(&raw(vec![("user", target), ("amount", OptionValue::Integer(1001))]))
            .unwrap_err();
        assert!(matches!(err.kind(), RouterErrorKind::InvalidOption { option, .. } if option == "amount"));
    }

    #[test]
    fn test_missing_required_option() {
        let schema = schema();
        let err = schema
            .get("buy")
            .unwrap()
            .validate(&HashMap::new())
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &RouterErrorKind::MissingOption {
                command: "buy".to_string(),
                option: "item_id".to_string()
            }
        );
    }

    #[test]
    fn test_choices_and_types_are_enforced() {
        let schema = schema();
        let leaderboard = schema.get("leaderboard").unwrap();

        assert!(leaderboard
            .validate(&raw(vec![("type", OptionValue::String("gdp".into()))]))
            .is_ok());
        assert!(leaderboard
            .validate(&raw(vec![("type", OptionValue::String("karma".into()))]))
            .is_err());
        assert!(leaderboard
            .validate(&raw(vec![("limit", OptionValue::String("5".into()))]))
            .is_err());
        assert!(leaderboard
            .validate(&raw(vec![("page", OptionValue::Integer(2))]))
            .is_err());
    }
}
