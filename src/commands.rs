//! Loaded command tables, and pushing them to Discord

use crate::api::{CommandApi, RemoteCommand, Scope};
use crate::definition::{CommandBody, CommandDefinition, Definition};
use crate::error::{Batch, Code, DomainError};
use crate::loader::Loader;
use crate::log_info;
use crate::logging::Section;
use anyhow::{anyhow, Result};
use serenity::all::{CommandId, GuildId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type Commands = HashMap<String, Arc<CommandDefinition>>;

/// Which commands `register` pushes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every loaded command of the scope, after clearing the scope remotely
    All,
    Named(String),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        match name {
            "*" => Target::All,
            _ => Target::Named(name.to_owned()),
        }
    }
}

pub struct CommandManager {
    global: RwLock<Commands>,
    guilds: RwLock<HashMap<GuildId, Commands>>,
    api: Arc<dyn CommandApi>,
    loader: Arc<Loader>,
}

fn collection_missing(guild: GuildId) -> anyhow::Error {
    DomainError::error(Code::CommandCollectionNotExist, guild).into()
}

fn unknown(name: &str, guild: Option<GuildId>) -> anyhow::Error {
    DomainError::error(
        Code::CommandUnknown,
        format!("{} in {}", name, Scope::from(guild)),
    )
    .into()
}

impl CommandManager {
    pub fn new(api: Arc<dyn CommandApi>, loader: Arc<Loader>) -> Self {
        Self {
            global: RwLock::new(HashMap::new()),
            guilds: RwLock::new(HashMap::new()),
            api,
            loader,
        }
    }

    /// Replaces both tables with freshly discovered commands
    pub async fn install(
        &self,
        global: HashMap<String, CommandDefinition>,
        guilds: HashMap<GuildId, HashMap<String, CommandDefinition>>,
    ) {
        let wrap = |commands: HashMap<String, CommandDefinition>| -> Commands {
            commands
                .into_iter()
                .map(|(name, command)| (name, Arc::new(command)))
                .collect()
        };

        *self.global.write().await = wrap(global);
        *self.guilds.write().await = guilds
            .into_iter()
            .map(|(id, commands)| (id, wrap(commands)))
            .collect();
    }

    /// Command invoked as `name` from `guild`: the guild's own definition wins over the global one
    pub async fn resolve(
        &self,
        name: &str,
        guild: Option<GuildId>,
    ) -> Option<Arc<CommandDefinition>> {
        if let Some(id) = guild {
            let guilds = self.guilds.read().await;
            if let Some(command) = guilds.get(&id).and_then(|commands| commands.get(name)) {
                return Some(command.clone());
            }
        }

        self.global.read().await.get(name).cloned()
    }

    /// Command loaded in exactly this scope
    pub async fn get(&self, name: &str, guild: Option<GuildId>) -> Option<Arc<CommandDefinition>> {
        match guild {
            Some(id) => self
                .guilds
                .read()
                .await
                .get(&id)
                .and_then(|commands| commands.get(name))
                .cloned(),
            None => self.global.read().await.get(name).cloned(),
        }
    }

    pub async fn guild_ids(&self) -> Vec<GuildId> {
        let mut ids: Vec<_> = self.guilds.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// (global, guild) command counts
    pub async fn counts(&self) -> (usize, usize) {
        let global = self.global.read().await.len();
        let guild = self.guilds.read().await.values().map(HashMap::len).sum();
        (global, guild)
    }

    /// Bodies of a scope, sorted by name
    async fn bodies(&self, guild: Option<GuildId>) -> Result<Vec<CommandBody>> {
        let mut bodies: Vec<CommandBody> = match guild {
            Some(id) => self
                .guilds
                .read()
                .await
                .get(&id)
                .ok_or_else(|| collection_missing(id))?
                .values()
                .map(|command| command.body.clone())
                .collect(),
            None => self
                .global
                .read()
                .await
                .values()
                .map(|command| command.body.clone())
                .collect(),
        };

        bodies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(bodies)
    }

    /// Creates commands on Discord.
    ///
    /// `Target::All` is a reset, not a diff: the scope is cleared remotely, then every loaded
    /// command is created again.  A command that fails to create is reported in the batch and
    /// the others still go through.
    pub async fn register(
        &self,
        target: impl Into<Target>,
        guild: Option<GuildId>,
    ) -> Result<Batch<Vec<RemoteCommand>>> {
        let scope = Scope::from(guild);

        match target.into() {
            Target::All => {
                let bodies = self.bodies(guild).await?;
                self.api.set(scope, &[]).await?;

                let mut batch = Batch::new(Vec::new());
                for body in bodies {
                    match self.api.create(scope, &body).await {
                        Ok(remote) => batch.loaded.push(remote),
                        Err(err) => batch.fail(err.context(format!(
                            "Could not create command `{}` in {}",
                            body.name, scope
                        ))),
                    }
                }

                log_info!(
                    Section::CommandManager;
                    "{} {} commands registered",
                    batch.loaded.len(),
                    scope
                );
                Ok(batch)
            }
            Target::Named(name) => {
                let command = match guild {
                    Some(id) => {
                        let guilds = self.guilds.read().await;
                        let commands = guilds.get(&id).ok_or_else(|| collection_missing(id))?;
                        commands.get(&name).cloned()
                    }
                    None => self.global.read().await.get(&name).cloned(),
                };
                let command = command.ok_or_else(|| unknown(&name, guild))?;

                let remote = self.api.create(scope, &command.body).await?;
                Ok(Batch::new(vec![remote]))
            }
        }
    }

    /// Removes a command from Discord
    pub async fn delete(&self, id: CommandId, guild: Option<GuildId>) -> Result<()> {
        let scope = Scope::from(guild);
        let remote = self.api.fetch(scope, id).await?.ok_or_else(|| {
            anyhow::Error::from(DomainError::error(
                Code::CommandNotExistOnApi,
                format!("{} in {}", id, scope),
            ))
        })?;

        self.api.delete(scope, remote.id).await
    }

    /// One command by id, or every command of the scope
    pub async fn fetch(
        &self,
        id: Option<CommandId>,
        guild: Option<GuildId>,
    ) -> Result<Vec<RemoteCommand>> {
        let scope = Scope::from(guild);
        match id {
            Some(id) => Ok(self.api.fetch(scope, id).await?.into_iter().collect()),
            None => self.api.fetch_all(scope).await,
        }
    }

    /// Reads a loaded command's file again and swaps the result in with a single write, so a
    /// dispatch sees either the old definition or the new one.  If the file no longer loads,
    /// the command is unloaded and the error is returned.
    pub async fn refresh(
        &self,
        name: &str,
        guild: Option<GuildId>,
    ) -> Result<Arc<CommandDefinition>> {
        let current = match guild {
            Some(id) => self
                .guilds
                .read()
                .await
                .get(&id)
                .ok_or_else(|| collection_missing(id))?
                .get(name)
                .cloned(),
            None => self.global.read().await.get(name).cloned(),
        };
        let current = current.ok_or_else(|| unknown(name, guild))?;

        let loaded = self
            .loader
            .discover_one(&current.path, guild)
            .await
            .and_then(|definition| match definition {
                Definition::Command(command) => Ok(Arc::new(command)),
                other => Err(anyhow!("`{}` is not a command", other.key())),
            });

        match guild {
            Some(id) => {
                let mut guilds = self.guilds.write().await;
                swap(guilds.entry(id).or_default(), name, &loaded);
            }
            None => swap(&mut *self.global.write().await, name, &loaded),
        }

        let fresh = loaded?;
        log_info!(
            Section::CommandManager;
            "{} refreshed in {}",
            fresh.body.name,
            Scope::from(guild)
        );
        Ok(fresh)
    }
}

/// Replaces `name` with what a refresh loaded, or drops it if loading failed
fn swap(commands: &mut Commands, name: &str, loaded: &Result<Arc<CommandDefinition>>) {
    commands.remove(name);
    if let Ok(fresh) = loaded {
        commands.insert(fresh.body.name.clone(), fresh.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code_of;
    use crate::testing::{execs, FakeApi, Tree};
    use std::path::PathBuf;

    const GUILD: u64 = 713172382042423352;

    async fn manager(tree: &Tree, api: Arc<FakeApi>) -> CommandManager {
        let loader = Arc::new(Loader::new(tree.root(), Arc::new(execs())));
        let manager = CommandManager::new(api, loader.clone());
        let batch = loader.discover_all().await;
        assert!(batch.errors.is_empty());
        manager.install(batch.loaded.global, batch.loaded.guilds).await;
        manager
    }

    fn tree() -> Tree {
        let tree = Tree::new();
        tree.command(None, "ping", "v1");
        tree.command(None, "info", "v1");
        tree.command(Some(GUILD), "avatar", "v1");
        tree.command(Some(GUILD), "ping", "v2");
        tree
    }

    #[tokio::test]
    async fn guild_definition_shadows_global() {
        let tree = tree();
        let manager = manager(&tree, Arc::new(FakeApi::default())).await;
        let guild = Some(GuildId::new(GUILD));

        let in_guild = manager.resolve("ping", guild).await.unwrap();
        assert_eq!(in_guild.exec.as_ref().map(|e| e.key.as_str()), Some("v2"));

        let in_dm = manager.resolve("ping", None).await.unwrap();
        assert_eq!(in_dm.exec.as_ref().map(|e| e.key.as_str()), Some("v1"));

        assert!(manager.resolve("avatar", None).await.is_none());
        assert!(manager.resolve("info", guild).await.is_some());
        assert_eq!(manager.counts().await, (2, 2));
    }

    #[tokio::test]
    async fn full_registration_resets_the_scope() {
        let tree = tree();
        let api = Arc::new(FakeApi::default());
        let manager = manager(&tree, api.clone()).await;
        let guild = Some(GuildId::new(GUILD));

        let first = manager.register("*", guild).await.unwrap();
        assert!(first.errors.is_empty());
        let after_first = api.names(guild.into());
        assert_eq!(after_first, vec!["avatar", "ping"]);
        let calls_after_first = api.calls();

        manager.register("*", guild).await.unwrap();
        assert_eq!(api.names(guild.into()), after_first);
        // One reset plus one create per command, every time
        assert_eq!(api.calls(), calls_after_first * 2);
        assert_eq!(calls_after_first, 3);

        // Global untouched
        assert!(api.names(Scope::Global).is_empty());
    }

    #[tokio::test]
    async fn failed_creates_do_not_stop_the_rest() {
        let tree = tree();
        let api = Arc::new(FakeApi::failing(&["info"]));
        let manager = manager(&tree, api.clone()).await;

        let batch = manager.register(Target::All, None).await.unwrap();
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.loaded.len(), 1);
        assert_eq!(api.names(Scope::Global), vec!["ping"]);
    }

    #[tokio::test]
    async fn single_registration_errors() {
        let tree = tree();
        let api = Arc::new(FakeApi::default());
        let manager = manager(&tree, api.clone()).await;

        let absent = manager.register("ping", Some(GuildId::new(1))).await;
        assert_eq!(code_of(&absent.err().unwrap()), Some(Code::CommandCollectionNotExist));

        let all_absent = manager.register("*", Some(GuildId::new(1))).await;
        assert_eq!(code_of(&all_absent.err().unwrap()), Some(Code::CommandCollectionNotExist));

        let unknown = manager.register("nope", None).await;
        assert_eq!(code_of(&unknown.err().unwrap()), Some(Code::CommandUnknown));

        let created = manager.register("ping", None).await.unwrap();
        assert_eq!(created.loaded[0].name, "ping");
        assert_eq!(api.names(Scope::Global), vec!["ping"]);
    }

    #[tokio::test]
    async fn delete_needs_a_remote_command() {
        let tree = tree();
        let api = Arc::new(FakeApi::default());
        let manager = manager(&tree, api.clone()).await;

        let missing = manager.delete(CommandId::new(42), None).await;
        assert_eq!(code_of(&missing.err().unwrap()), Some(Code::CommandNotExistOnApi));

        let batch = manager.register("*", None).await.unwrap();
        let ping = batch.loaded.iter().find(|c| c.name == "ping").unwrap().id;

        assert_eq!(manager.fetch(Some(ping), None).await.unwrap().len(), 1);
        manager.delete(ping, None).await.unwrap();
        assert_eq!(api.names(Scope::Global), vec!["info"]);
        assert_eq!(manager.fetch(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refresh_reads_the_file_again() {
        let tree = tree();
        let manager = manager(&tree, Arc::new(FakeApi::default())).await;

        tree.command(None, "ping", "v2");
        let fresh = manager.refresh("ping", None).await.unwrap();
        assert_eq!(fresh.exec.as_ref().map(|e| e.key.as_str()), Some("v2"));

        let loaded = manager.get("ping", None).await.unwrap();
        assert!(Arc::ptr_eq(&loaded, &fresh));

        let unknown = manager.refresh("nope", None).await;
        assert_eq!(code_of(&unknown.err().unwrap()), Some(Code::CommandUnknown));
    }

    #[tokio::test]
    async fn broken_refresh_unloads() {
        let tree = tree();
        let manager = manager(&tree, Arc::new(FakeApi::default())).await;

        tree.write("commands/global/ping.toml", "handler = 'v1'");
        let broken = manager.refresh("ping", None).await;
        assert_eq!(code_of(&broken.err().unwrap()), Some(Code::CommandMissingBody));
        assert!(manager.get("ping", None).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn refresh_never_exposes_the_global_fallback() {
        let tree = tree();
        let manager = Arc::new(manager(&tree, Arc::new(FakeApi::default())).await);
        let guild = Some(GuildId::new(GUILD));
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let watcher = tokio::spawn({
            let manager = manager.clone();
            let done = done.clone();
            async move {
                let mut seen = 0;
                loop {
                    let ping = manager.resolve("ping", guild).await.unwrap();
                    assert_eq!(ping.exec.as_ref().map(|e| e.key.as_str()), Some("v2"));
                    seen += 1;
                    if done.load(std::sync::atomic::Ordering::SeqCst) {
                        return seen;
                    }
                    tokio::task::yield_now().await;
                }
            }
        });

        for _ in 0..50 {
            manager.refresh("ping", guild).await.unwrap();
        }
        done.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(watcher.await.unwrap() > 0);
    }

    #[tokio::test]
    async fn refresh_can_rename() {
        let tree = tree();
        let manager = manager(&tree, Arc::new(FakeApi::default())).await;

        tree.write(
            "commands/global/ping.toml",
            "handler = 'v2'\n[body]\nname = 'pong'\ndescription = 'd'",
        );
        manager.refresh("ping", None).await.unwrap();

        assert!(manager.get("ping", None).await.is_none());
        let pong = manager.get("pong", None).await.unwrap();
        assert_eq!(pong.path, PathBuf::from("ping.toml"));
    }

    #[test]
    fn star_means_all() {
        assert_eq!(Target::from("*"), Target::All);
        assert_eq!(Target::from("ping"), Target::Named("ping".to_owned()));
    }
}
