//! The bot as a whole: configuration, the interaction side and the event side

use crate::api::CommandApi;
use crate::commands::Target;
use crate::config::Config;
use crate::contents::Contents;
use crate::definition::Exec;
use crate::event::{Event, Gateway};
use crate::events::{EventManager, Listener};
use crate::interactions::InteractionManager;
use crate::loader::Loader;
use crate::logging::{self, Section};
use crate::registry::Registry;
use crate::{log_info, log_success};
use serenity::all::UserId;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

pub struct Sucrose {
    pub cfg: RwLock<Config>,
    pub interactions: InteractionManager,
    pub events: EventManager<Gateway>,
}

impl Sucrose {
    pub fn new(
        cfg: Config,
        execs: Registry<dyn Exec>,
        listeners: Registry<dyn Listener<Gateway>>,
        api: Arc<dyn CommandApi>,
    ) -> Self {
        let root = cfg.root().to_path_buf();
        let loader = Arc::new(Loader::new(&root, Arc::new(execs)));
        let interactions =
            InteractionManager::new(loader, api, Contents::new(cfg.general.locale));
        let events = EventManager::new(
            root.join("events"),
            Event::NAMES,
            cfg.events.ignore.clone(),
            Arc::new(listeners),
        );

        Self {
            cfg: RwLock::new(cfg),
            interactions,
            events,
        }
    }

    /// Loads every handler file, then binds every event
    pub async fn build(&self) {
        let start = Instant::now();

        let counts = self.interactions.build().await;
        logging::blank();

        let batch = self.events.bind_all().await;
        logging::report(batch.errors, Section::EventManager);
        logging::blank();

        log_success!(
            "{} commands, {} buttons, {} select menus and {} events loaded in {}ms",
            counts.global + counts.guild,
            counts.buttons,
            counts.select_menus,
            batch.loaded,
            start.elapsed().as_millis()
        );
    }

    /// Registers every loaded command, global then per guild.  Failures are logged.
    pub async fn register_all(&self) {
        let scopes = std::iter::once(None).chain(
            self.interactions
                .commands
                .guild_ids()
                .await
                .into_iter()
                .map(Some),
        );

        for guild in scopes {
            match self.interactions.commands.register(Target::All, guild).await {
                Ok(batch) => logging::report(batch.errors, Section::CommandManager),
                Err(err) => logging::error(&err, Some(Section::CommandManager)),
            }
        }

        log_info!(Section::CommandManager; "Registration done");
    }

    pub async fn is_owner(&self, user: UserId) -> bool {
        let id = user.to_string();
        self.cfg.read().await.general.bot_owners.contains(&id)
    }
}
