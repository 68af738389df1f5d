use crate::{context::Call, definition::Exec};
use anyhow::{anyhow, Context, Result};

/// Discord caps messages at 2000 characters
const MAX_LEN: usize = 1900;

/// `/code <command>`: shows the handler file of a loaded command
pub struct PluginCode;

#[serenity::async_trait]
impl Exec for PluginCode {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        let name = call
            .interaction
            .string_option("command")
            .ok_or_else(|| anyhow!("Missing `command` option"))?;
        let commands = &call.sucrose.interactions.commands;

        let guild = call.interaction.guild_id();
        let scoped = match guild {
            Some(id) => commands.get(&name, Some(id)).await.map(|c| (c, Some(id))),
            None => None,
        };
        let found = match scoped {
            Some(found) => Some(found),
            None => commands.get(&name, None).await.map(|c| (c, None)),
        };

        let Some((command, scope)) = found else {
            return call.reply(format!("`/{}` is not loaded", name)).await;
        };

        let path = call
            .sucrose
            .interactions
            .loader()
            .scope_dir(scope)
            .join(&command.path);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Could not read `{}`", path.display()))?;

        let mut shown: String = text.chars().take(MAX_LEN).collect();
        if shown.len() < text.len() {
            shown.push_str("\n# ...");
        }

        call.reply(format!("```toml\n{}\n```", shown.trim_end())).await
    }
}
