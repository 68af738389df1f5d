use crate::{context::Call, definition::Exec};
use anyhow::{bail, Result};
use serenity::all::{
    CommandDataOptionValue, CreateEmbed, CreateInteractionResponseMessage, Interaction,
};

/// `/avatar [member]`
pub struct PluginAvatar;

#[serenity::async_trait]
impl Exec for PluginAvatar {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let Some((_, Interaction::Command(command))) = call.interaction.discord() else {
            bail!("/avatar needs a command interaction");
        };

        let picked = command.data.options.iter().find_map(|option| match option.value {
            CommandDataOptionValue::User(id) => command.data.resolved.users.get(&id),
            _ => None,
        });
        let user = picked.unwrap_or(&command.user);

        let embed = CreateEmbed::new()
            .title(format!("{}'s avatar", user.name))
            .image(user.face());

        call.respond(CreateInteractionResponseMessage::new().embed(embed))
            .await
    }
}
