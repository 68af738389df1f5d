//! Walks the handler tree and turns every manifest into a definition.
//!
//! ```text
//! <root>/commands/global/<command>.toml
//! <root>/commands/global/<command>/<sub command or group>.toml
//! <root>/commands/global/<command>/<group>/<sub command>.toml
//! <root>/commands/guilds/<guild id>/...          same layout as global
//! <root>/interactions/buttons/<button>.toml
//! <root>/interactions/select_menus/<menu>.toml
//! ```
//!
//! Files are read from disk on every call, so a refresh always sees the latest edit.

use crate::definition::*;
use crate::error::{Batch, Code, DomainError};
use crate::logging::{progress_bar, Section};
use crate::registry::Registry;
use crate::{log_info, manifest};
use anyhow::{Context, Result};
use serenity::all::GuildId;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const EXT: &str = "toml";

/// Everything found by a full pass
#[derive(Debug, Default)]
pub struct Discovery {
    pub global: HashMap<String, CommandDefinition>,
    pub guilds: HashMap<GuildId, HashMap<String, CommandDefinition>>,
    pub buttons: HashMap<String, ButtonDefinition>,
    pub select_menus: HashMap<String, SelectMenuDefinition>,
}

pub struct Loader {
    root: PathBuf,
    execs: Arc<Registry<dyn Exec>>,
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Manifest file names directly inside `dir`, sorted
async fn files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Could not read folder `{}`", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && path.extension().is_some_and(|ext| ext == EXT) {
            files.push(PathBuf::from(entry.file_name()));
        }
    }

    files.sort();
    Ok(files)
}

/// Folder names directly inside `dir`, sorted
async fn folders(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Could not read folder `{}`", dir.display()))?;

    let mut folders = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            folders.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    folders.sort();
    Ok(folders)
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read `{}`", path.display()))
}

fn parse_guild(name: &str) -> Option<GuildId> {
    name.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(GuildId::new)
}

/// Inserts unless the key is taken, in which case the first one wins
fn insert_unique<T>(
    map: &mut HashMap<String, T>,
    key: String,
    value: T,
    errors: &mut Vec<anyhow::Error>,
    scope: &str,
) {
    use std::collections::hash_map::Entry::*;
    match map.entry(key) {
        Occupied(occupied) => errors.push(
            DomainError::warn(Code::NameDuplicated, format!("{} in {}", occupied.key(), scope))
                .into(),
        ),
        Vacant(vacant) => {
            vacant.insert(value);
        }
    }
}

impl Loader {
    pub fn new(root: impl Into<PathBuf>, execs: Arc<Registry<dyn Exec>>) -> Self {
        Self {
            root: root.into(),
            execs,
        }
    }

    /// Folder holding the command files of a scope
    pub fn scope_dir(&self, guild: Option<GuildId>) -> PathBuf {
        let commands = self.root.join("commands");
        match guild {
            Some(id) => commands.join("guilds").join(id.to_string()),
            None => commands.join("global"),
        }
    }

    /// Full pass over the tree.  A file that fails is reported in the batch and skipped.
    pub async fn discover_all(&self) -> Batch<Discovery> {
        let mut batch = Batch::new(Discovery::default());

        // Global commands
        let global_dir = self.scope_dir(None);
        if is_dir(&global_dir).await {
            let mut global = HashMap::new();
            self.commands_in(None, &mut global, &mut batch.errors).await;
            batch.loaded.global = global;
        }

        // Guild commands
        let guilds_dir = self.root.join("commands").join("guilds");
        if is_dir(&guilds_dir).await {
            match folders(&guilds_dir).await {
                Ok(names) => {
                    for name in names {
                        let Some(guild) = parse_guild(&name) else {
                            batch.fail(DomainError::warn(
                                Code::GuildIdInvalid,
                                guilds_dir.join(&name).display(),
                            ));
                            continue;
                        };

                        let mut commands = HashMap::new();
                        self.commands_in(Some(guild), &mut commands, &mut batch.errors)
                            .await;
                        batch.loaded.guilds.insert(guild, commands);
                    }
                }
                Err(err) => batch.fail(err),
            }
        }

        // Buttons
        let buttons_dir = self.root.join("interactions").join("buttons");
        if is_dir(&buttons_dir).await {
            match files(&buttons_dir).await {
                Ok(files) => {
                    let total = files.len();
                    for file in files {
                        let path = buttons_dir.join(&file);
                        let loaded = match read(&path).await {
                            Ok(text) => manifest::button(&text, &path, &self.execs),
                            Err(err) => Err(err),
                        };
                        match loaded {
                            Ok(button) => insert_unique(
                                &mut batch.loaded.buttons,
                                button.key().to_owned(),
                                button,
                                &mut batch.errors,
                                "buttons",
                            ),
                            Err(err) => batch.fail(err),
                        }
                    }
                    let loaded = batch.loaded.buttons.len();
                    log_info!(
                        Section::InteractionManager;
                        "{} {}/{} buttons loaded",
                        progress_bar(loaded, total, 10),
                        loaded,
                        total
                    );
                }
                Err(err) => batch.fail(err),
            }
        }

        // Select menus
        let menus_dir = self.root.join("interactions").join("select_menus");
        if is_dir(&menus_dir).await {
            match files(&menus_dir).await {
                Ok(files) => {
                    let total = files.len();
                    for file in files {
                        let path = menus_dir.join(&file);
                        let loaded = match read(&path).await {
                            Ok(text) => manifest::select_menu(&text, &path, &self.execs),
                            Err(err) => Err(err),
                        };
                        match loaded {
                            Ok(menu) => insert_unique(
                                &mut batch.loaded.select_menus,
                                menu.data.custom_id.clone(),
                                menu,
                                &mut batch.errors,
                                "select menus",
                            ),
                            Err(err) => batch.fail(err),
                        }
                    }
                    let loaded = batch.loaded.select_menus.len();
                    log_info!(
                        Section::InteractionManager;
                        "{} {}/{} select menus loaded",
                        progress_bar(loaded, total, 10),
                        loaded,
                        total
                    );
                }
                Err(err) => batch.fail(err),
            }
        }

        batch
    }

    async fn commands_in(
        &self,
        guild: Option<GuildId>,
        commands: &mut HashMap<String, CommandDefinition>,
        errors: &mut Vec<anyhow::Error>,
    ) {
        let dir = self.scope_dir(guild);
        let scope = match guild {
            Some(id) => format!("guild {}", id),
            None => "global".to_owned(),
        };

        let files = match files(&dir).await {
            Ok(files) => files,
            Err(err) => {
                errors.push(err);
                return;
            }
        };

        let total = files.len();
        for file in files {
            match self.command(&file, guild).await {
                Ok(command) => insert_unique(
                    commands,
                    command.body.name.clone(),
                    command,
                    errors,
                    &scope,
                ),
                Err(err) => errors.push(err),
            }
        }

        log_info!(
            Section::CommandManager;
            "{} {}/{} {} commands loaded",
            progress_bar(commands.len(), total, 10),
            commands.len(),
            total,
            scope
        );
    }

    /// Loads one file.  Buttons and select menus are addressed by their path from the root
    /// (`interactions/buttons/again.toml`); commands by their file name within the scope picked
    /// by `guild` (`ping.toml`), as kept in `CommandDefinition::path`.
    pub async fn discover_one(
        &self,
        relative: &Path,
        guild: Option<GuildId>,
    ) -> Result<Definition> {
        let path = self.root.join(relative);

        if relative.starts_with("interactions/buttons") {
            let text = read(&path).await?;
            return Ok(Definition::Button(manifest::button(&text, &path, &self.execs)?));
        }

        if relative.starts_with("interactions/select_menus") {
            let text = read(&path).await?;
            return Ok(Definition::SelectMenu(manifest::select_menu(
                &text,
                &path,
                &self.execs,
            )?));
        }

        Ok(Definition::Command(self.command(relative, guild).await?))
    }

    /// Loads a command file and, for chat input commands with a same-named folder, its sub
    /// command groups and sub commands.  The folder replaces any options the file declared.
    pub async fn command(&self, file: &Path, guild: Option<GuildId>) -> Result<CommandDefinition> {
        let scope_dir = self.scope_dir(guild);
        let path = scope_dir.join(file);
        let text = read(&path).await?;
        let mut command = manifest::command(&text, &path, file, &self.execs)?;

        let group_dir = scope_dir.join(&command.body.name);
        if command.body.kind != CommandKind::ChatInput || !is_dir(&group_dir).await {
            return Ok(command);
        }

        command.body.options.clear();
        let mut options = BTreeMap::new();

        for sub_file in files(&group_dir).await? {
            let sub_path = group_dir.join(&sub_file);
            let mut sub = manifest::sub_option(&read(&sub_path).await?, &sub_path, &self.execs)?;

            let leaf_dir = group_dir.join(&sub.option.name);
            if sub.option.kind == OptionKind::SubCommandGroup && is_dir(&leaf_dir).await {
                sub.option.options.clear();
                let mut leaves = BTreeMap::new();

                for leaf_file in files(&leaf_dir).await? {
                    let leaf_path = leaf_dir.join(&leaf_file);
                    let leaf =
                        manifest::sub_option(&read(&leaf_path).await?, &leaf_path, &self.execs)?;

                    // Discord allows two levels only
                    if leaf.option.kind != OptionKind::SubCommand {
                        return Err(DomainError::error(
                            Code::TypeUnrecognized,
                            format!("group inside group in {}", leaf_path.display()),
                        )
                        .into());
                    }

                    if leaves.contains_key(&leaf.option.name) {
                        return Err(DomainError::error(
                            Code::NameDuplicated,
                            format!("{} in {}", leaf.option.name, leaf_dir.display()),
                        )
                        .into());
                    }

                    sub.option.options.push(leaf.option.clone());
                    leaves.insert(leaf.option.name.clone(), leaf);
                }

                sub.options = Some(leaves);
            }

            if options.contains_key(&sub.option.name) {
                return Err(DomainError::error(
                    Code::NameDuplicated,
                    format!("{} in {}", sub.option.name, group_dir.display()),
                )
                .into());
            }

            command.body.options.push(sub.option.clone());
            options.insert(sub.option.name.clone(), sub);
        }

        command.options = Some(options);
        Ok(command)
    }
}
