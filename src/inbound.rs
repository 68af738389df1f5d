//! The interaction side the dispatcher needs to see.  Serenity interactions implement it through
//! `Incoming`; tests can provide their own.

use anyhow::{bail, Result};
use serenity::all::{
    CommandDataOption, CommandDataOptionValue, CommandType, ComponentInteractionDataKind, Context,
    CreateInteractionResponse, CreateInteractionResponseMessage, GuildId, Interaction, Permissions,
    UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    ChatInput,
    ContextMenu,
    Button,
    SelectMenu,
}

#[serenity::async_trait]
pub trait Inbound: Send + Sync {
    /// None for interactions the bot doesn't route (autocomplete, modals, pings)
    fn kind(&self) -> Option<InteractionKind>;
    /// Command name, or custom id for components
    fn name(&self) -> &str;
    fn guild_id(&self) -> Option<GuildId>;
    fn user_id(&self) -> Option<UserId>;
    fn user_name(&self) -> Option<&str>;
    fn sub_command_group(&self) -> Option<&str>;
    fn sub_command(&self) -> Option<&str>;
    /// Permissions of the bot where the interaction happened
    fn app_permissions(&self) -> Option<Permissions>;
    /// Permissions of the invoking member, absent outside guilds
    fn member_permissions(&self) -> Option<Permissions>;

    /// String option value, looked up through sub commands
    fn string_option(&self, _name: &str) -> Option<String> {
        None
    }

    /// Values chosen in a select menu
    fn values(&self) -> Vec<String> {
        Vec::new()
    }

    /// Sends the interaction response
    async fn respond(&self, message: CreateInteractionResponseMessage) -> Result<()>;

    async fn reply(&self, content: String) -> Result<()> {
        self.respond(CreateInteractionResponseMessage::new().content(content))
            .await
    }

    /// Underlying serenity objects, for callbacks needing more than the above
    fn discord(&self) -> Option<(&Context, &Interaction)> {
        None
    }
}

/// Interaction straight from the gateway
pub struct Incoming {
    pub ctx: Context,
    pub interaction: Interaction,
}

impl Incoming {
    pub fn new(ctx: Context, interaction: Interaction) -> Self {
        Self { ctx, interaction }
    }

    fn command_options(&self) -> &[CommandDataOption] {
        match &self.interaction {
            Interaction::Command(command) => &command.data.options,
            _ => &[],
        }
    }
}

/// Reported (group, sub command) names of a chat input command
fn structure(options: &[CommandDataOption]) -> (Option<&str>, Option<&str>) {
    let Some(first) = options.first() else {
        return (None, None);
    };

    match &first.value {
        CommandDataOptionValue::SubCommandGroup(inner) => (
            Some(first.name.as_str()),
            inner.first().map(|sub| sub.name.as_str()),
        ),
        CommandDataOptionValue::SubCommand(_) => (None, Some(first.name.as_str())),
        _ => (None, None),
    }
}

fn find_string(options: &[CommandDataOption], name: &str) -> Option<String> {
    options.iter().find_map(|option| match &option.value {
        CommandDataOptionValue::String(value) if option.name == name => Some(value.clone()),
        CommandDataOptionValue::SubCommand(inner)
        | CommandDataOptionValue::SubCommandGroup(inner) => find_string(inner, name),
        _ => None,
    })
}

#[serenity::async_trait]
impl Inbound for Incoming {
    fn kind(&self) -> Option<InteractionKind> {
        match &self.interaction {
            Interaction::Command(command) => match command.data.kind {
                CommandType::ChatInput => Some(InteractionKind::ChatInput),
                _ => Some(InteractionKind::ContextMenu),
            },
            Interaction::Component(component) => match component.data.kind {
                ComponentInteractionDataKind::Button => Some(InteractionKind::Button),
                ComponentInteractionDataKind::Unknown(_) => None,
                _ => Some(InteractionKind::SelectMenu),
            },
            _ => None,
        }
    }

    fn name(&self) -> &str {
        match &self.interaction {
            Interaction::Command(command) => &command.data.name,
            Interaction::Component(component) => &component.data.custom_id,
            _ => "",
        }
    }

    fn guild_id(&self) -> Option<GuildId> {
        match &self.interaction {
            Interaction::Command(command) => command.guild_id,
            Interaction::Component(component) => component.guild_id,
            _ => None,
        }
    }

    fn user_id(&self) -> Option<UserId> {
        match &self.interaction {
            Interaction::Command(command) => Some(command.user.id),
            Interaction::Component(component) => Some(component.user.id),
            _ => None,
        }
    }

    fn user_name(&self) -> Option<&str> {
        match &self.interaction {
            Interaction::Command(command) => Some(&command.user.name),
            Interaction::Component(component) => Some(&component.user.name),
            _ => None,
        }
    }

    fn sub_command_group(&self) -> Option<&str> {
        structure(self.command_options()).0
    }

    fn sub_command(&self) -> Option<&str> {
        structure(self.command_options()).1
    }

    fn app_permissions(&self) -> Option<Permissions> {
        match &self.interaction {
            Interaction::Command(command) => command.app_permissions,
            Interaction::Component(component) => component.app_permissions,
            _ => None,
        }
    }

    fn member_permissions(&self) -> Option<Permissions> {
        match &self.interaction {
            Interaction::Command(command) => command.member.as_ref().and_then(|m| m.permissions),
            Interaction::Component(component) => {
                component.member.as_ref().and_then(|m| m.permissions)
            }
            _ => None,
        }
    }

    fn string_option(&self, name: &str) -> Option<String> {
        find_string(self.command_options(), name)
    }

    fn values(&self) -> Vec<String> {
        match &self.interaction {
            Interaction::Component(component) => match &component.data.kind {
                ComponentInteractionDataKind::StringSelect { values } => values.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    async fn respond(&self, message: CreateInteractionResponseMessage) -> Result<()> {
        let response = CreateInteractionResponse::Message(message);

        match &self.interaction {
            Interaction::Command(command) => {
                command.create_response(&self.ctx.http, response).await?
            }
            Interaction::Component(component) => {
                component.create_response(&self.ctx.http, response).await?
            }
            _ => bail!("This interaction can't be replied to"),
        }

        Ok(())
    }

    fn discord(&self) -> Option<(&Context, &Interaction)> {
        Some((&self.ctx, &self.interaction))
    }
}
