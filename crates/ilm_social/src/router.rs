//! Command router: validates requests, dispatches to the engines and renders
//! replies.

use crate::{
    CommandError, CommandSchema, OptionValue, ParsedOptions, QUIZ_TIMEOUT_MINUTES, QuestionBank,
    QuizCategory, QuizSessions, RouterError, RouterErrorKind,
};
use chrono::Utc;
use ilm_core::{
    AccountKey, Difficulty, Direction, GameKind, GuildId, ItemCategory, LeaderboardMetric,
    TransactionKind,
};
use ilm_economy::{DonationCause, EconomyErrorKind, Ledger, RewardEngine};
use ilm_roles::{
    MemberSnapshot, RoleVerificationEngine, VerificationOutcome, VerificationRequest,
    VerifyErrorKind,
};
use std::collections::HashMap;
use std::fmt::Write;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Generic reply for operational failures.
const TRY_AGAIN_LATER: &str = "Something went wrong on our side. Please try again later.";

/// Default `/history` page.
const DEFAULT_HISTORY: usize = 10;

/// Default leaderboard page.
const DEFAULT_LEADERBOARD: usize = 10;

/// Platform permissions of the invoking member that commands care about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorPermissions {
    /// May view other members' balances
    pub manage_messages: bool,
}

/// A slash command invocation, normalized by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Command name without the slash
    pub command_name: String,
    /// Invoking member
    pub actor: MemberSnapshot,
    /// Invoking member's permissions
    pub permissions: ActorPermissions,
    /// Guild the command ran in, `None` in direct messages
    pub guild_id: Option<GuildId>,
    /// Raw options keyed by name
    pub options: HashMap<String, OptionValue>,
}

impl CommandRequest {
    /// A request without options.
    pub fn new(
        command_name: impl Into<String>,
        actor: MemberSnapshot,
        guild_id: Option<GuildId>,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            actor,
            permissions: ActorPermissions::default(),
            guild_id,
            options: HashMap::new(),
        }
    }

    /// Add an option.
    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Set the actor's permissions.
    pub fn with_permissions(mut self, permissions: ActorPermissions) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Text sent back to the invoking member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message body
    pub content: String,
    /// Visible to the invoker only
    pub ephemeral: bool,
}

impl Reply {
    /// A reply everyone in the channel sees.
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// A reply only the invoker sees.
    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Routes commands to the ledger, reward and verification engines.
#[derive(Debug)]
pub struct CommandRouter {
    ledger: Arc<Ledger>,
    rewards: RewardEngine,
    roles: Arc<RoleVerificationEngine>,
    schema: CommandSchema,
    questions: QuestionBank,
    quizzes: QuizSessions,
}

impl CommandRouter {
    /// Create a router over the engines.
    pub fn new(rewards: RewardEngine, roles: Arc<RoleVerificationEngine>) -> Self {
        let ledger = rewards.ledger().clone();
        let schema = CommandSchema::new(ledger.config());
        Self {
            ledger,
            rewards,
            roles,
            schema,
            questions: QuestionBank::default(),
            quizzes: QuizSessions::new(),
        }
    }

    /// Replace the quiz question bank.
    pub fn with_question_bank(mut self, questions: QuestionBank) -> Self {
        self.questions = questions;
        self
    }

    /// The option schema commands are validated against.
    pub fn schema(&self) -> &CommandSchema {
        &self.schema
    }

    /// Handle one command and produce the reply. Never fails: errors are
    /// rendered into the reply and logged.
    #[instrument(
        skip(self, request),
        fields(
            command = %request.command_name,
            actor = %request.actor.user_id,
            guild = ?request.guild_id
        )
    )]
    pub async fn handle(&self, request: CommandRequest) -> Reply {
        match self.dispatch(&request).await {
            Ok(reply) => reply,
            Err(err) if err.is_user_facing() => {
                debug!(error = %err, "Command rejected");
                Reply::private(render_error(&request, &err))
            }
            Err(err) => {
                error!(error = %err, "Command failed");
                Reply::private(TRY_AGAIN_LATER)
            }
        }
    }

    async fn dispatch(&self, request: &CommandRequest) -> Result<Reply, CommandError> {
        let name = request.command_name.as_str();
        let spec = self.schema.get(name).ok_or_else(|| {
            RouterError::new(RouterErrorKind::UnknownCommand(name.to_string()))
        })?;
        let options = spec.validate(&request.options)?;
        debug!("Options validated");

        match name {
            "verify_female" => return self.verify(request, &options, Direction::Female).await,
            "verify_male" => return self.verify(request, &options, Direction::Male).await,
            "shop" => return Ok(self.shop(&options)),
            _ => {}
        }

        // Everything else touches a guild-scoped account
        let guild_id = request.guild_id.ok_or_else(|| {
            RouterError::new(RouterErrorKind::NotGuildContext(name.to_string()))
        })?;
        let actor = AccountKey::new(guild_id, request.actor.user_id);

        match name {
            "balance" => self.balance(request, &options, actor).await,
            "daily" => self.daily(actor).await,
            "transfer" => self.transfer(&options, actor).await,
            "donate" => self.donate(&options, actor).await,
            "leaderboard" => self.leaderboard(&options, guild_id).await,
            "buy" => self.buy(&options, actor).await,
            "inventory" => self.inventory(actor).await,
            "achievements" => self.achievements(actor).await,
            "history" => self.history(&options, actor).await,
            "quiz" => self.quiz(&options, actor),
            "answer" => self.answer(&options, actor).await,
            _ => Err(RouterError::new(RouterErrorKind::UnknownCommand(name.to_string())).into()),
        }
    }

    async fn balance(
        &self,
        request: &CommandRequest,
        options: &ParsedOptions,
        actor: AccountKey,
    ) -> Result<Reply, CommandError> {
        let target = options.user("user");
        let key = match target {
            Some(member) if member.user_id != actor.user_id => {
                if !request.permissions.manage_messages {
                    return Err(RouterError::new(RouterErrorKind::PermissionDenied {
                        command: "balance".to_string(),
                        reason: "viewing another member's balance needs Manage Messages"
                            .to_string(),
                    })
                    .into());
                }
                if member.is_bot {
                    return Err(invalid_user("balance", "bots do not have accounts").into());
                }
                AccountKey::new(actor.guild_id, member.user_id)
            }
            _ => actor,
        };

        let account = if key == actor {
            self.ledger.balance(key).await?
        } else {
            self.ledger.peek(key).await?
        };
        let mention = format!("<@{}>", key.user_id);
        Ok(Reply::public(format!(
            "{}'s balance\nIlm Coins: {}\nGood Deed Points: {}\nDaily streak: {} days\nTotal earned: {}",
            mention,
            account.coin_balance,
            account.good_deed_points,
            account.daily_streak,
            account.total_earned
        )))
    }

    async fn daily(&self, actor: AccountKey) -> Result<Reply, CommandError> {
        let claim = self.rewards.claim_daily(actor, Utc::now()).await?;
        let mut content = format!(
            "You received {} Ilm Coins! Streak: {} days.",
            claim.reward, claim.streak
        );
        if claim.weekly_bonus > 0 {
            let _ = write!(
                content,
                "\nWeekly streak bonus: +{} Ilm Coins!",
                claim.weekly_bonus
            );
        }
        let _ = write!(content, "\nBalance: {}", claim.account.coin_balance);
        self.append_achievements(&mut content, actor).await;
        Ok(Reply::public(content))
    }

    async fn transfer(
        &self,
        options: &ParsedOptions,
        actor: AccountKey,
    ) -> Result<Reply, CommandError> {
        let (Some(target), Some(amount)) = (options.user("user"), options.integer("amount")) else {
            return Err(invalid_user("transfer", "a member and an amount are required").into());
        };
        if target.is_bot {
            return Err(invalid_user("transfer", "bots do not have accounts").into());
        }
        let receiver = AccountKey::new(actor.guild_id, target.user_id);
        let note = options.string("message").map(str::to_string);

        let transfer = self.ledger.transfer(actor, receiver, amount, note).await?;
        let mut content = format!(
            "Sent {} Ilm Coins to {}. Your balance: {}",
            amount,
            target.mention(),
            transfer.sender.coin_balance
        );
        if let Some(message) = options.string("message") {
            let _ = write!(content, "\nMessage: {}", message);
        }
        Ok(Reply::public(content))
    }

    async fn donate(&self, options: &ParsedOptions, actor: AccountKey) -> Result<Reply, CommandError> {
        let amount = options.integer("amount").unwrap_or_default();
        let cause = options
            .string("cause")
            .and_then(|c| DonationCause::from_str(c).ok())
            .unwrap_or_default();

        let donation = self.ledger.donate(actor, amount, cause).await?;
        let mut content = format!(
            "Thank you for donating {} Ilm Coins to {}! You earned {} Good Deed Points.\nBalance: {}",
            amount, cause, donation.points_awarded, donation.account.coin_balance
        );
        self.append_achievements(&mut content, actor).await;
        Ok(Reply::public(content))
    }

    async fn leaderboard(
        &self,
        options: &ParsedOptions,
        guild_id: GuildId,
    ) -> Result<Reply, CommandError> {
        let metric = options
            .string("type")
            .and_then(|t| LeaderboardMetric::from_str(t).ok())
            .unwrap_or_default();
        let limit = options
            .integer("limit")
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_LEADERBOARD);

        let rows = self.ledger.leaderboard(guild_id, metric, limit).await?;
        if rows.is_empty() {
            return Ok(Reply::public("Nobody is on the leaderboard yet."));
        }
        let mut content = format!("Leaderboard: {}", metric.label());
        for (rank, row) in rows.iter().enumerate() {
            let _ = write!(content, "\n{}. <@{}>: {}", rank + 1, row.user_id, row.value);
        }
        Ok(Reply::public(content))
    }

    fn shop(&self, options: &ParsedOptions) -> Reply {
        let category = options
            .string("category")
            .and_then(|c| ItemCategory::from_str(c).ok());
        let items = self.ledger.shop().in_category(category);
        if items.is_empty() {
            return Reply::private("No items in this category.");
        }
        let mut content = String::from("Islamic Shop");
        for item in items {
            let _ = write!(
                content,
                "\n`{}` {}: {} Ilm Coins ({})",
                item.id, item.name, item.price, item.description
            );
        }
        content.push_str("\nUse /buy <item_id> to purchase.");
        Reply::public(content)
    }

    async fn buy(&self, options: &ParsedOptions, actor: AccountKey) -> Result<Reply, CommandError> {
        let item_id = options.string("item_id").unwrap_or_default();
        let purchase = self.ledger.purchase(actor, item_id).await?;
        let mut content = format!(
            "You bought {} for {} Ilm Coins.",
            purchase.item.name, purchase.item.price
        );
        if purchase.item.good_deed_points > 0 {
            let _ = write!(
                content,
                " +{} Good Deed Points!",
                purchase.item.good_deed_points
            );
        }
        let _ = write!(content, "\nBalance: {}", purchase.account.coin_balance);
        self.append_achievements(&mut content, actor).await;
        Ok(Reply::public(content))
    }

    async fn inventory(&self, actor: AccountKey) -> Result<Reply, CommandError> {
        let items = self.ledger.inventory(actor).await?;
        if items.is_empty() {
            return Ok(Reply::private(
                "Your inventory is empty. Visit /shop to buy items.",
            ));
        }
        let mut content = String::from("Your inventory");
        for entry in items {
            let name = self
                .ledger
                .shop()
                .get(&entry.item_id)
                .map(|item| item.name.as_str())
                .unwrap_or(entry.item_id.as_str());
            let _ = write!(content, "\n{} x{}", name, entry.quantity);
        }
        Ok(Reply::private(content))
    }

    async fn achievements(&self, actor: AccountKey) -> Result<Reply, CommandError> {
        let unlocked = self.ledger.achievements(actor).await?;
        let catalog = self.rewards.catalog();
        let mut content = format!(
            "Achievements: {}/{}",
            unlocked.len(),
            catalog.achievements.len()
        );
        for achievement in &catalog.achievements {
            let done = unlocked.iter().any(|u| u.achievement_id == achievement.id);
            let _ = write!(
                content,
                "\n[{}] {}: {}",
                if done { "x" } else { " " },
                achievement.name,
                achievement.description
            );
        }
        Ok(Reply::private(content))
    }

    async fn history(&self, options: &ParsedOptions, actor: AccountKey) -> Result<Reply, CommandError> {
        let limit = options
            .integer("limit")
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_HISTORY);
        let legs = self.ledger.history(actor, limit).await?;
        if legs.is_empty() {
            return Ok(Reply::private("No transactions yet."));
        }
        let mut content = String::from("Recent transactions");
        for leg in legs {
            let delta = leg.effect_on(actor);
            let _ = write!(
                content,
                "\n{} {:+} {}",
                leg.created_at.format("%Y-%m-%d %H:%M"),
                delta,
                describe(leg.kind)
            );
            if let Some(note) = &leg.note {
                let _ = write!(content, " ({})", note);
            }
        }
        Ok(Reply::private(content))
    }

    fn quiz(&self, options: &ParsedOptions, actor: AccountKey) -> Result<Reply, CommandError> {
        let category = options
            .string("category")
            .and_then(|c| QuizCategory::from_str(c).ok());
        let difficulty = options
            .string("difficulty")
            .and_then(|d| Difficulty::from_str(d).ok());

        let Some(question) = self.questions.pick(category, difficulty) else {
            return Ok(Reply::private(
                "No questions match that category and difficulty yet.",
            ));
        };

        let coins = self.rewards.games().coins(GameKind::Quiz, question.difficulty);
        let mut content = format!(
            "Islamic Knowledge Quiz ({}, {})\n{}",
            question.category, question.difficulty, question.question
        );
        for index in 0..question.options.len() {
            if let Some(line) = question.labeled(index) {
                let _ = write!(content, "\n{}", line);
            }
        }
        let _ = write!(
            content,
            "\nReply with /answer within {} minutes. Correct answer: {} Ilm Coins.",
            QUIZ_TIMEOUT_MINUTES,
            coins
        );

        debug!(question = %question.id, "Quiz started");
        self.quizzes.start(actor, question.clone(), Utc::now());
        Ok(Reply::private(content))
    }

    async fn answer(&self, options: &ParsedOptions, actor: AccountKey) -> Result<Reply, CommandError> {
        let choice = options.string("choice").unwrap_or_default();
        let question = self
            .quizzes
            .take(actor, Utc::now())
            .ok_or_else(|| RouterError::new(RouterErrorKind::NoActiveQuiz))?;
        let correct = question.is_correct(choice);

        let outcome = self
            .rewards
            .finish_game(actor, GameKind::Quiz, question.difficulty, correct, Utc::now())
            .await?;

        let mut content = if correct {
            format!(
                "Correct! You earned {} Ilm Coins.\n{}",
                outcome.coins, question.explanation
            )
        } else {
            format!(
                "Not quite. The answer was {}.\n{}",
                question.labeled(question.correct).unwrap_or_default(),
                question.explanation
            )
        };
        let _ = write!(content, "\nBalance: {}", outcome.account.coin_balance);
        self.append_achievements(&mut content, actor).await;
        Ok(Reply::private(content))
    }

    async fn verify(
        &self,
        request: &CommandRequest,
        options: &ParsedOptions,
        direction: Direction,
    ) -> Result<Reply, CommandError> {
        let Some(target) = options.user("user") else {
            return Err(invalid_user(&request.command_name, "a member is required").into());
        };
        let verification = VerificationRequest::new(
            request.guild_id,
            request.actor.clone(),
            target.clone(),
            direction,
        );

        let reply = match self.roles.verify(&verification).await? {
            VerificationOutcome::Verified {
                source_role_removed: true,
            } => format!(
                "Successfully verified {} as {} and removed the unverified role.",
                target.mention(),
                direction
            ),
            VerificationOutcome::Verified {
                source_role_removed: false,
            } => format!("Successfully verified {} as {}.", target.mention(), direction),
            VerificationOutcome::PartiallyVerified { removal_error } => {
                warn!(error = %removal_error, "Verification left the unverified role in place");
                match removal_error.kind() {
                    VerifyErrorKind::HierarchyViolation(_) => format!(
                        "Verified {} as {}, but I could not remove the unverified role. Please check my role position.",
                        target.mention(),
                        direction
                    ),
                    _ => format!(
                        "Verified {} as {}, but I could not remove the unverified role right now. Please remove it manually or try again later.",
                        target.mention(),
                        direction
                    ),
                }
            }
        };
        info!(%direction, target = %target.user_id, "Verification handled");
        Ok(Reply::private(reply))
    }

    /// Unlock achievements after a mutation and list them in the reply. A
    /// failure here never fails the command.
    async fn append_achievements(&self, content: &mut String, actor: AccountKey) {
        match self.rewards.check_achievements(actor, Utc::now()).await {
            Ok(unlocked) => {
                for achievement in unlocked {
                    let _ = write!(
                        content,
                        "\nAchievement unlocked: {}! {}",
                        achievement.name, achievement.description
                    );
                }
            }
            Err(e) => warn!(error = %e, "Achievement check failed"),
        }
    }
}

fn invalid_user(command: &str, reason: &str) -> RouterError {
    RouterError::new(RouterErrorKind::InvalidOption {
        command: command.to_string(),
        option: "user".to_string(),
        reason: reason.to_string(),
    })
}

fn describe(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Transfer => "transfer",
        TransactionKind::Daily => "daily reward",
        TransactionKind::Donate => "donation",
        TransactionKind::Work => "work",
        TransactionKind::GameReward => "game reward",
        TransactionKind::Grant => "welcome grant",
        TransactionKind::Purchase => "purchase",
        TransactionKind::Achievement => "achievement reward",
        TransactionKind::Reset => "reset",
    }
}

/// User-facing text for a rejected command.
pub fn render_error(request: &CommandRequest, err: &CommandError) -> String {
    match err {
        CommandError::Router(e) => match e.kind() {
            RouterErrorKind::UnknownCommand(name) => format!("Unknown command `/{}`.", name),
            RouterErrorKind::NotGuildContext(_) => {
                "This command can only be used in a server.".to_string()
            }
            RouterErrorKind::MissingOption { option, .. } => {
                format!("Missing required option `{}`.", option)
            }
            RouterErrorKind::InvalidOption { option, reason, .. } => {
                format!("Invalid value for `{}`: {}.", option, reason)
            }
            RouterErrorKind::NoActiveQuiz => {
                "You don't have an open quiz. Start one with /quiz.".to_string()
            }
            RouterErrorKind::PermissionDenied { .. } => {
                "You need the Manage Messages permission to view other members' balances."
                    .to_string()
            }
        },
        CommandError::Economy(e) => match e.kind() {
            EconomyErrorKind::InvalidAmount(reason) => format!("Invalid amount: {}.", reason),
            EconomyErrorKind::InsufficientFunds { balance, required } => format!(
                "You need {} Ilm Coins but only have {}.",
                required, balance
            ),
            EconomyErrorKind::SameAccount => "You can't transfer coins to yourself.".to_string(),
            EconomyErrorKind::CooldownActive { available_at } => format!(
                "You already claimed your daily reward. Come back <t:{}:R>.",
                available_at.timestamp()
            ),
            EconomyErrorKind::UnknownItem(id) => {
                format!("There is no item called `{}` in the shop.", id)
            }
            EconomyErrorKind::TransfersDisabled => "Transfers are currently disabled.".to_string(),
            _ => TRY_AGAIN_LATER.to_string(),
        },
        CommandError::Verify(e) => match e.kind() {
            VerifyErrorKind::NotGuildContext => {
                "This command can only be used in a server.".to_string()
            }
            VerifyErrorKind::Forbidden { .. } => {
                "You don't have permission to use this command.".to_string()
            }
            VerifyErrorKind::InvalidTarget(_) => "Bots cannot be verified.".to_string(),
            VerifyErrorKind::AlreadyVerified => {
                let target = request
                    .options
                    .get("user")
                    .and_then(|v| match v {
                        OptionValue::User(member) => Some(member.mention()),
                        _ => None,
                    })
                    .unwrap_or_else(|| "That member".to_string());
                let direction = if request.command_name == "verify_female" {
                    Direction::Female
                } else {
                    Direction::Male
                };
                format!("{} is already verified as {}.", target, direction)
            }
            VerifyErrorKind::HierarchyViolation(_) => {
                "I don't have permission to manage roles. Please check my permissions.".to_string()
            }
            _ => TRY_AGAIN_LATER.to_string(),
        },
    }
}
