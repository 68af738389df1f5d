use crate::event::{Event, Gateway};
use crate::events::Listener;
use crate::logging::Section;
use crate::{log_info, log_success};
use anyhow::Result;

/// Connection summary once Discord is ready
pub struct PluginReady;

#[serenity::async_trait]
impl Listener<Gateway> for PluginReady {
    async fn listen(&self, args: &Gateway) -> Result<()> {
        let Event::Ready(ready) = &*args.event else {
            return Ok(());
        };

        // Connected to server
        log_success!(
            "Connected as {} to {} guilds",
            ready.user.name,
            ready.guilds.len()
        );
        Ok(())
    }
}

pub struct PluginGuildCreate;

#[serenity::async_trait]
impl Listener<Gateway> for PluginGuildCreate {
    async fn listen(&self, args: &Gateway) -> Result<()> {
        let Event::GuildCreate { guild, is_new } = &*args.event else {
            return Ok(());
        };

        let how = match is_new {
            Some(true) => "Joined",
            _ => "Available",
        };
        log_info!(Section::EventManager; "{} {} ({})", how, guild.name, guild.id);
        Ok(())
    }
}
