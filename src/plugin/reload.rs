use crate::context::Call;
use crate::definition::Exec;
use crate::error::{code_of, Code};
use anyhow::{anyhow, Result};
use serenity::all::CommandId;

const OWNER_ONLY: &str = "⛔ Only bot owners can reload things";

/// Replies and returns false unless the caller owns the bot
async fn from_owner(call: &Call<'_>) -> Result<bool> {
    let owner = match call.interaction.user_id() {
        Some(id) => call.sucrose.is_owner(id).await,
        None => false,
    };

    if !owner {
        call.reply(OWNER_ONLY).await?;
    }
    Ok(owner)
}

fn string_option(call: &Call<'_>, name: &str) -> Result<String> {
    call.interaction
        .string_option(name)
        .ok_or_else(|| anyhow!("Missing `{}` option", name))
}

/// `/reload command`: reads a command file again and registers it
pub struct PluginReloadCommand;

#[serenity::async_trait]
impl Exec for PluginReloadCommand {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        if !from_owner(call).await? {
            return Ok(());
        }

        let name = string_option(call, "name")?;
        let commands = &call.sucrose.interactions.commands;

        // The guild's own command if there is one, the global one otherwise
        let guild = match call.interaction.guild_id() {
            Some(id) if commands.get(&name, Some(id)).await.is_some() => Some(id),
            _ => None,
        };

        commands.refresh(&name, guild).await?;
        commands.register(name.as_str(), guild).await?;

        call.reply(format!("✅ `/{}` reloaded", name)).await
    }
}

/// `/reload event`: binds an event listener again
pub struct PluginReloadEvent;

#[serenity::async_trait]
impl Exec for PluginReloadEvent {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        if !from_owner(call).await? {
            return Ok(());
        }

        let name = string_option(call, "name")?;
        call.sucrose.events.rebind(&name).await?;

        call.reply(format!("✅ `{}` rebound", name)).await
    }
}

/// `/reload config`
pub struct PluginReloadConfig;

#[serenity::async_trait]
impl Exec for PluginReloadConfig {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        if !from_owner(call).await? {
            return Ok(());
        }

        call.sucrose.cfg.write().await.reload().await?;
        call.reply("Configuration reloaded successfully").await
    }
}

/// `/reload list`: commands Discord has registered, globally and in the current guild
pub struct PluginReloadList;

#[serenity::async_trait]
impl Exec for PluginReloadList {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        if !from_owner(call).await? {
            return Ok(());
        }

        let commands = &call.sucrose.interactions.commands;
        let mut remote = commands.fetch(None, None).await?;
        if let Some(guild) = call.interaction.guild_id() {
            remote.extend(commands.fetch(None, Some(guild)).await?);
        }

        if remote.is_empty() {
            return call.reply("Nothing is registered").await;
        }

        let lines: Vec<String> = remote
            .iter()
            .map(|c| format!("`/{}` `{}` ({})", c.name, c.id, c.scope))
            .collect();
        call.reply(lines.join("\n")).await
    }
}

/// `/reload delete`: removes a registered command from Discord
pub struct PluginReloadDelete;

#[serenity::async_trait]
impl Exec for PluginReloadDelete {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        if !from_owner(call).await? {
            return Ok(());
        }

        let raw = string_option(call, "id")?;
        let Some(id) = raw.parse::<u64>().ok().filter(|id| *id != 0) else {
            return call.reply(format!("`{}` is not a command id", raw)).await;
        };
        let id = CommandId::new(id);
        let commands = &call.sucrose.interactions.commands;

        // The current guild's command if it has one with this id, the global one otherwise
        let guild = match call.interaction.guild_id() {
            Some(guild) if !commands.fetch(Some(id), Some(guild)).await?.is_empty() => Some(guild),
            _ => None,
        };

        match commands.delete(id, guild).await {
            Ok(()) => call.reply(format!("🗑️ `{}` deleted", id)).await,
            Err(err) if code_of(&err) == Some(Code::CommandNotExistOnApi) => {
                call.reply(format!("`{}` is not registered", id)).await
            }
            Err(err) => Err(err),
        }
    }
}
