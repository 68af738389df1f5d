mod api;
mod commands;
mod config;
mod contents;
mod context;
mod definition;
mod error;
mod event;
mod events;
mod handler;
mod inbound;
mod interactions;
mod loader;
mod logging;
mod manifest;
mod plugin;
mod registry;
mod sucrose;
#[cfg(test)]
mod testing;

use serenity::{all::Http, Client};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = crate::config::Config::load().await?;
    crate::logging::init(&cfg.logging.directory)?;
    let token = cfg.general.discord_token.clone();
    let intents = cfg.intents();

    // Command registration needs the application id before the gateway is up
    let http = Arc::new(Http::new(&token));
    let application = http.get_current_application_info().await?;
    http.set_application_id(application.id);

    let api = Arc::new(crate::api::SerenityApi::new(http));
    let sucrose = Arc::new(crate::sucrose::Sucrose::new(
        cfg,
        crate::plugin::execs(),
        crate::plugin::listeners(),
        api,
    ));
    sucrose.build().await;

    Client::builder(&token, intents)
        .event_handler(handler::Handler::new(sucrose))
        .await?
        .start()
        .await
        .map_err(Into::into)
}
