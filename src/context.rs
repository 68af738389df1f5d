use crate::{inbound::Inbound, sucrose::Sucrose};
use serenity::all::CreateInteractionResponseMessage;

/// What a callback gets to work with: the interaction that triggered it and the bot that
/// dispatched it.
pub struct Call<'a> {
    pub interaction: &'a dyn Inbound,
    pub sucrose: &'a Sucrose,
}

impl<'a> Call<'a> {
    pub fn new(interaction: &'a dyn Inbound, sucrose: &'a Sucrose) -> Self {
        Self {
            interaction,
            sucrose,
        }
    }

    pub async fn reply(&self, content: impl Into<String>) -> anyhow::Result<()> {
        self.interaction.reply(content.into()).await
    }

    pub async fn respond(&self, message: CreateInteractionResponseMessage) -> anyhow::Result<()> {
        self.interaction.respond(message).await
    }
}
