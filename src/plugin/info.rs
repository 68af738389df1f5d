use crate::{context::Call, definition::Exec};
use anyhow::{bail, Result};
use serenity::all::{CreateActionRow, CreateInteractionResponseMessage};

pub const INFO_SECTION: &str = "info_section";

/// `/info show user`
pub struct PluginInfoUser;

#[serenity::async_trait]
impl Exec for PluginInfoUser {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let Some(id) = call.interaction.user_id() else {
            bail!("Interaction has no user");
        };
        let name = call.interaction.user_name().unwrap_or("?");

        call.reply(format!(
            "👤 **{}** (`{}`), on Discord since <t:{}:D>",
            name,
            id,
            id.created_at().unix_timestamp()
        ))
        .await
    }
}

/// `/info show server`
pub struct PluginInfoServer;

#[serenity::async_trait]
impl Exec for PluginInfoServer {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let Some(guild_id) = call.interaction.guild_id() else {
            return call.reply("This only works in a server").await;
        };

        let content = match call.interaction.discord() {
            Some((ctx, _)) => {
                let guild = guild_id.to_partial_guild(&ctx.http).await?;
                format!(
                    "🏠 **{}** (`{}`), owned by <@{}>",
                    guild.name, guild.id, guild.owner_id
                )
            }
            None => format!("🏠 `{}`", guild_id),
        };

        call.reply(content).await
    }
}

/// `/info bot`, with a menu to pick a section
pub struct PluginInfoBot;

#[serenity::async_trait]
impl Exec for PluginInfoBot {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let counts = call.sucrose.interactions.counts().await;
        let mut message = CreateInteractionResponseMessage::new().content(format!(
            "🤖 {} commands, {} buttons, {} select menus, {} events",
            counts.global + counts.guild,
            counts.buttons,
            counts.select_menus,
            call.sucrose.events.len().await
        ));

        if let Some(menu) = call.sucrose.interactions.select_menu(INFO_SECTION).await {
            message = message.components(vec![CreateActionRow::SelectMenu(menu.to_create())]);
        }

        call.respond(message).await
    }
}

/// Choice made in the `/info bot` menu
pub struct PluginInfoSection;

#[serenity::async_trait]
impl Exec for PluginInfoSection {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let counts = call.sucrose.interactions.counts().await;

        let content = match call.interaction.values().first().map(String::as_str) {
            Some("commands") => format!(
                "{} global commands, {} guild commands",
                counts.global, counts.guild
            ),
            Some("interactions") => format!(
                "{} buttons, {} select menus",
                counts.buttons, counts.select_menus
            ),
            Some("events") => format!("{} events bound", call.sucrose.events.len().await),
            Some(other) => bail!("Unknown info section `{}`", other),
            None => bail!("No info section chosen"),
        };

        call.reply(content).await
    }
}
