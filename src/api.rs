//! Command registration endpoints, global or per guild

use crate::definition::CommandBody;
use anyhow::Result;
use serenity::all::{Command, CommandId, GuildId, Http};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Guild(GuildId),
}

impl From<Option<GuildId>> for Scope {
    fn from(guild: Option<GuildId>) -> Self {
        match guild {
            Some(id) => Scope::Guild(id),
            None => Scope::Global,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Guild(id) => write!(f, "guild {}", id),
        }
    }
}

/// A command as Discord knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub name: String,
    pub scope: Scope,
}

impl From<Command> for RemoteCommand {
    fn from(command: Command) -> Self {
        Self {
            id: command.id,
            name: command.name,
            scope: command.guild_id.into(),
        }
    }
}

#[serenity::async_trait]
pub trait CommandApi: Send + Sync {
    /// Replaces every command of the scope; an empty slice clears it
    async fn set(&self, scope: Scope, bodies: &[CommandBody]) -> Result<Vec<RemoteCommand>>;
    async fn create(&self, scope: Scope, body: &CommandBody) -> Result<RemoteCommand>;
    async fn fetch_all(&self, scope: Scope) -> Result<Vec<RemoteCommand>>;
    async fn delete(&self, scope: Scope, id: CommandId) -> Result<()>;

    async fn fetch(&self, scope: Scope, id: CommandId) -> Result<Option<RemoteCommand>> {
        Ok(self
            .fetch_all(scope)
            .await?
            .into_iter()
            .find(|command| command.id == id))
    }
}

/// Talks to Discord through serenity's HTTP client
pub struct SerenityApi {
    http: Arc<Http>,
}

impl SerenityApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[serenity::async_trait]
impl CommandApi for SerenityApi {
    async fn set(&self, scope: Scope, bodies: &[CommandBody]) -> Result<Vec<RemoteCommand>> {
        let builders = bodies.iter().map(CommandBody::to_create).collect();
        let commands = match scope {
            Scope::Global => Command::set_global_commands(&self.http, builders).await?,
            Scope::Guild(id) => id.set_commands(&self.http, builders).await?,
        };
        Ok(commands.into_iter().map(Into::into).collect())
    }

    async fn create(&self, scope: Scope, body: &CommandBody) -> Result<RemoteCommand> {
        let command = match scope {
            Scope::Global => Command::create_global_command(&self.http, body.to_create()).await?,
            Scope::Guild(id) => id.create_command(&self.http, body.to_create()).await?,
        };
        Ok(command.into())
    }

    async fn fetch_all(&self, scope: Scope) -> Result<Vec<RemoteCommand>> {
        let commands = match scope {
            Scope::Global => Command::get_global_commands(&self.http).await?,
            Scope::Guild(id) => id.get_commands(&self.http).await?,
        };
        Ok(commands.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, scope: Scope, id: CommandId) -> Result<()> {
        match scope {
            Scope::Global => Command::delete_global_command(&self.http, id).await?,
            Scope::Guild(guild) => guild.delete_command(&self.http, id).await?,
        }
        Ok(())
    }
}
