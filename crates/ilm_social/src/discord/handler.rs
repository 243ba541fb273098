//! Serenity event handler: registers slash commands and routes interactions.

use crate::{ActorPermissions, CommandRequest, CommandRouter, CommandSpec, OptionKind, OptionValue};
use ilm_core::{GuildId, RoleId, UserId};
use ilm_roles::MemberSnapshot;
use serenity::all::{
    Command, CommandInteraction, CommandOptionType, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, Interaction, Ready, ResolvedValue,
};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::gateway::GatewayIntents;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Event handler for the Ilm Garden bot.
pub struct IlmHandler {
    router: Arc<CommandRouter>,
}

impl IlmHandler {
    /// Create a handler that forwards commands to `router`.
    pub fn new(router: Arc<CommandRouter>) -> Self {
        Self { router }
    }

    /// Slash commands arrive over the guilds intent alone.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
    }

    fn to_request(command: &CommandInteraction) -> CommandRequest {
        let (actor, permissions) = match &command.member {
            Some(member) => (
                MemberSnapshot::new(
                    member.user.id.get(),
                    member.display_name(),
                    member.roles.iter().map(|r| RoleId::from(r.get())),
                ),
                ActorPermissions {
                    manage_messages: member
                        .permissions
                        .is_some_and(|p| p.manage_messages()),
                },
            ),
            None => (
                MemberSnapshot::new(
                    command.user.id.get(),
                    command.user.name.clone(),
                    std::iter::empty(),
                ),
                ActorPermissions::default(),
            ),
        };

        let mut options = HashMap::new();
        for option in command.data.options() {
            let value = match option.value {
                ResolvedValue::Integer(n) => OptionValue::Integer(n),
                ResolvedValue::String(s) => OptionValue::String(s.to_string()),
                ResolvedValue::User(user, member) => {
                    let roles = member
                        .map(|m| m.roles.iter().map(|r| RoleId::from(r.get())).collect())
                        .unwrap_or_else(Vec::new);
                    let name = member
                        .and_then(|m| m.nick.clone())
                        .unwrap_or_else(|| user.name.clone());
                    let snapshot = MemberSnapshot::new(UserId::from(user.id.get()), name, roles);
                    OptionValue::User(if user.bot { snapshot.bot() } else { snapshot })
                }
                _ => {
                    debug!(option = option.name, "Ignoring unsupported option type");
                    continue;
                }
            };
            options.insert(option.name.to_string(), value);
        }

        CommandRequest {
            command_name: command.data.name.clone(),
            actor,
            permissions,
            guild_id: command.guild_id.map(|g| GuildId::from(g.get())),
            options,
        }
    }
}

/// Slash command registrations generated from the router's schema.
pub fn build_commands(specs: &[CommandSpec]) -> Vec<CreateCommand> {
    specs
        .iter()
        .map(|spec| {
            let mut command = CreateCommand::new(spec.name).description(spec.description);
            for option in &spec.options {
                let created = match &option.kind {
                    OptionKind::Integer { min, max } => CreateCommandOption::new(
                        CommandOptionType::Integer,
                        option.name,
                        option.name,
                    )
                    .min_int_value((*min).max(0) as u64)
                    .max_int_value((*max).max(0) as u64),
                    OptionKind::String { choices } => {
                        let mut created = CreateCommandOption::new(
                            CommandOptionType::String,
                            option.name,
                            option.name,
                        );
                        for choice in choices.iter().flatten() {
                            created = created.add_string_choice(*choice, *choice);
                        }
                        created
                    }
                    OptionKind::User => {
                        CreateCommandOption::new(CommandOptionType::User, option.name, option.name)
                    }
                };
                command = command.add_option(created.required(option.required));
            }
            command
        })
        .collect()
}

#[async_trait]
impl EventHandler for IlmHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guild_count = ready.guilds.len(),
            "Discord bot connected"
        );

        let commands = build_commands(self.router.schema().commands());
        match Command::set_global_commands(&ctx.http, commands).await {
            Ok(registered) => info!(count = registered.len(), "Registered slash commands"),
            Err(e) => error!(error = %e, "Failed to register slash commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let request = Self::to_request(&command);
        let reply = self.router.handle(request).await;

        let message = CreateInteractionResponseMessage::new()
            .content(reply.content)
            .ephemeral(reply.ephemeral);
        if let Err(e) = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(message))
            .await
        {
            error!(command = %command.data.name, error = %e, "Failed to send reply");
        }
    }
}
