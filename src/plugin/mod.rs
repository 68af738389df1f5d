//! Callbacks and listeners shipped with the bot.  Handler files under `bot/` refer to them by
//! the keys below.

use crate::definition::Exec;
use crate::event::Gateway;
use crate::events::Listener;
use crate::registry::Registry;
use std::sync::Arc;

mod avatar;
mod code;
mod info;
mod ping;
mod ready;
mod reload;

pub fn execs() -> Registry<dyn Exec> {
    let mut execs: Registry<dyn Exec> = Registry::new();
    execs
        // Global
        .insert("ping", Arc::new(ping::PluginPing))
        .insert("info_user", Arc::new(info::PluginInfoUser))
        .insert("info_server", Arc::new(info::PluginInfoServer))
        .insert("info_bot", Arc::new(info::PluginInfoBot))
        .insert("reload_command", Arc::new(reload::PluginReloadCommand))
        .insert("reload_event", Arc::new(reload::PluginReloadEvent))
        .insert("reload_config", Arc::new(reload::PluginReloadConfig))
        .insert("reload_list", Arc::new(reload::PluginReloadList))
        .insert("reload_delete", Arc::new(reload::PluginReloadDelete))
        // Guild only
        .insert("avatar", Arc::new(avatar::PluginAvatar))
        .insert("code", Arc::new(code::PluginCode))
        // Components
        .insert(ping::PING_AGAIN, Arc::new(ping::PluginPingAgain))
        .insert(info::INFO_SECTION, Arc::new(info::PluginInfoSection));
    execs
}

pub fn listeners() -> Registry<dyn Listener<Gateway>> {
    let mut listeners: Registry<dyn Listener<Gateway>> = Registry::new();
    listeners
        .insert("ready", Arc::new(ready::PluginReady))
        .insert("guild_create", Arc::new(ready::PluginGuildCreate));
    listeners
}
