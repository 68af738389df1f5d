use crate::{context::Call, definition::Exec};
use anyhow::Result;
use serenity::all::{CreateActionRow, CreateInteractionResponseMessage};

pub const PING_AGAIN: &str = "ping_again";

/// `/ping`, with a button to ping again
pub struct PluginPing;

#[serenity::async_trait]
impl Exec for PluginPing {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let mut message = CreateInteractionResponseMessage::new().content("🏓 Pong!");

        if let Some(button) = call.sucrose.interactions.button(PING_AGAIN).await {
            message = message.components(vec![CreateActionRow::Buttons(vec![button.to_create()])]);
        }

        call.respond(message).await
    }
}

pub struct PluginPingAgain;

#[serenity::async_trait]
impl Exec for PluginPingAgain {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let who = call.interaction.user_name().unwrap_or("someone");
        call.reply(format!("🏓 Pong again, {}!", who)).await
    }
}
