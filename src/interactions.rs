//! Routes an inbound interaction to the one callback that should run for it

use crate::api::CommandApi;
use crate::commands::CommandManager;
use crate::contents::{Contents, Notice};
use crate::context::Call;
use crate::definition::{ButtonDefinition, Callback, Requirements, SelectMenuDefinition};
use crate::inbound::{Inbound, InteractionKind};
use crate::loader::Loader;
use crate::logging::{self, Section};
use crate::sucrose::Sucrose;
use anyhow::anyhow;
use futures_util::FutureExt;
use serenity::all::Permissions;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The callback ran to completion
    Executed,
    /// The user was told why nothing ran
    Replied(Notice),
    /// A permission gate stopped it.  Outside guilds this happens without a reply.
    Denied(Option<Notice>),
    /// Nothing to run: unknown name or custom id, no callback, or an unrouted interaction
    Ignored,
    /// The callback returned an error or panicked
    Failed,
}

/// Loaded definitions per table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub global: usize,
    pub guild: usize,
    pub buttons: usize,
    pub select_menus: usize,
}

pub struct InteractionManager {
    pub commands: CommandManager,
    buttons: RwLock<HashMap<String, Arc<ButtonDefinition>>>,
    select_menus: RwLock<HashMap<String, Arc<SelectMenuDefinition>>>,
    loader: Arc<Loader>,
    contents: Contents,
}

/// Permissions of `required` that `granted` lacks
fn missing(granted: Permissions, required: Permissions) -> Permissions {
    if granted.contains(Permissions::ADMINISTRATOR) {
        return Permissions::empty();
    }
    required.difference(granted)
}

/// `Err` carries the outcome that ends the dispatch early
type Step<T> = std::result::Result<T, Outcome>;

impl InteractionManager {
    pub fn new(loader: Arc<Loader>, api: Arc<dyn CommandApi>, contents: Contents) -> Self {
        Self {
            commands: CommandManager::new(api, loader.clone()),
            buttons: RwLock::new(HashMap::new()),
            select_menus: RwLock::new(HashMap::new()),
            loader,
            contents,
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Discovers the whole tree and replaces every table.  Failures are logged.
    pub async fn build(&self) -> Counts {
        let batch = self.loader.discover_all().await;
        let discovery = batch.loaded;

        self.commands
            .install(discovery.global, discovery.guilds)
            .await;
        *self.buttons.write().await = discovery
            .buttons
            .into_iter()
            .map(|(id, button)| (id, Arc::new(button)))
            .collect();
        *self.select_menus.write().await = discovery
            .select_menus
            .into_iter()
            .map(|(id, menu)| (id, Arc::new(menu)))
            .collect();

        logging::report(batch.errors, Section::InteractionManager);
        self.counts().await
    }

    pub async fn counts(&self) -> Counts {
        let (global, guild) = self.commands.counts().await;
        Counts {
            global,
            guild,
            buttons: self.buttons.read().await.len(),
            select_menus: self.select_menus.read().await.len(),
        }
    }

    pub async fn button(&self, custom_id: &str) -> Option<Arc<ButtonDefinition>> {
        self.buttons.read().await.get(custom_id).cloned()
    }

    pub async fn select_menu(&self, custom_id: &str) -> Option<Arc<SelectMenuDefinition>> {
        self.select_menus.read().await.get(custom_id).cloned()
    }

    /// Runs whatever `inbound` resolves to.  Never fails: errors end up in the log and in the
    /// returned outcome.
    pub async fn dispatch(&self, sucrose: &Sucrose, inbound: &dyn Inbound) -> Outcome {
        let Some(kind) = inbound.kind() else {
            return Outcome::Ignored;
        };
        tracing::debug!(name = inbound.name(), ?kind, "dispatching interaction");

        let resolved = match kind {
            InteractionKind::ChatInput | InteractionKind::ContextMenu => {
                self.resolve_command(inbound, kind).await
            }
            InteractionKind::Button => match self.button(inbound.name()).await {
                Some(button) => self
                    .gate(inbound, button.permissions.as_ref())
                    .await
                    .map(|()| (button.exec.clone(), button.key().to_owned())),
                None => Err(Outcome::Ignored),
            },
            InteractionKind::SelectMenu => match self.select_menu(inbound.name()).await {
                Some(menu) => self
                    .gate(inbound, menu.permissions.as_ref())
                    .await
                    .map(|()| (menu.exec.clone(), menu.data.custom_id.clone())),
                None => Err(Outcome::Ignored),
            },
        };

        match resolved {
            Ok((Some(exec), label)) => self.run(sucrose, inbound, &exec, &label).await,
            Ok((None, _)) => Outcome::Ignored,
            Err(outcome) => outcome,
        }
    }

    /// Walks command → group → sub command, checking each gate on the way
    async fn resolve_command(
        &self,
        inbound: &dyn Inbound,
        kind: InteractionKind,
    ) -> Step<(Option<Callback>, String)> {
        let name = inbound.name();
        let command = self
            .commands
            .resolve(name, inbound.guild_id())
            .await
            .ok_or(Outcome::Ignored)?;

        self.gate(inbound, command.permissions.as_ref()).await?;

        if kind != InteractionKind::ChatInput {
            return Ok((command.exec.clone(), name.to_owned()));
        }

        match (inbound.sub_command_group(), inbound.sub_command()) {
            (Some(group_name), sub_name) => {
                let Some(options) = &command.options else {
                    return Err(self
                        .notify(inbound, Notice::MissingSubCommandGroups(name.to_owned()))
                        .await);
                };
                let Some(group) = options.get(group_name) else {
                    return Err(self
                        .notify(inbound, Notice::MissingSubCommandGroup(group_name.to_owned()))
                        .await);
                };

                self.gate(inbound, group.permissions.as_ref()).await?;

                let Some(sub_name) = sub_name else {
                    return Err(Outcome::Ignored);
                };
                let Some(subs) = &group.options else {
                    return Err(self
                        .notify(inbound, Notice::MissingSubCommands(group_name.to_owned()))
                        .await);
                };
                let Some(sub) = subs.get(sub_name) else {
                    return Err(self
                        .notify(inbound, Notice::MissingSubCommand(sub_name.to_owned()))
                        .await);
                };

                self.gate(inbound, sub.permissions.as_ref()).await?;
                Ok((
                    sub.exec.clone(),
                    format!("{} {} {}", name, group_name, sub_name),
                ))
            }
            (None, Some(sub_name)) => {
                let Some(options) = &command.options else {
                    return Err(self
                        .notify(inbound, Notice::MissingSubCommands(name.to_owned()))
                        .await);
                };
                let Some(sub) = options.get(sub_name) else {
                    return Err(self
                        .notify(inbound, Notice::MissingSubCommand(sub_name.to_owned()))
                        .await);
                };

                self.gate(inbound, sub.permissions.as_ref()).await?;
                Ok((sub.exec.clone(), format!("{} {}", name, sub_name)))
            }
            (None, None) => Ok((command.exec.clone(), name.to_owned())),
        }
    }

    /// Checks the bot's permissions, then the member's
    async fn gate(&self, inbound: &dyn Inbound, requirements: Option<&Requirements>) -> Step<()> {
        let Some(requirements) = requirements else {
            return Ok(());
        };
        if requirements.client.is_empty() && requirements.member.is_empty() {
            return Ok(());
        }

        // Nothing to check permissions against in DMs
        if inbound.guild_id().is_none() {
            return Err(Outcome::Denied(None));
        }

        let client = missing(
            inbound.app_permissions().unwrap_or_else(Permissions::empty),
            requirements.client,
        );
        if !client.is_empty() {
            let notice = Notice::MissingClientPermissions(client);
            self.send(inbound, &notice).await;
            return Err(Outcome::Denied(Some(notice)));
        }

        let member = missing(
            inbound.member_permissions().unwrap_or_else(Permissions::empty),
            requirements.member,
        );
        if !member.is_empty() {
            let notice = Notice::MissingMemberPermissions(inbound.user_id(), member);
            self.send(inbound, &notice).await;
            return Err(Outcome::Denied(Some(notice)));
        }

        Ok(())
    }

    async fn notify(&self, inbound: &dyn Inbound, notice: Notice) -> Outcome {
        self.send(inbound, &notice).await;
        Outcome::Replied(notice)
    }

    async fn send(&self, inbound: &dyn Inbound, notice: &Notice) {
        if let Err(err) = inbound.reply(self.contents.render(notice)).await {
            logging::error(
                &err.context(format!("Could not reply to `{}`", inbound.name())),
                Some(Section::InteractionEvent),
            );
        }
    }

    async fn run(
        &self,
        sucrose: &Sucrose,
        inbound: &dyn Inbound,
        exec: &Callback,
        label: &str,
    ) -> Outcome {
        let call = Call::new(inbound, sucrose);

        match AssertUnwindSafe(exec.exec(&call)).catch_unwind().await {
            Ok(Ok(())) => Outcome::Executed,
            Ok(Err(err)) => {
                logging::error(
                    &err.context(format!("`{}` failed", label)),
                    Some(Section::InteractionEvent),
                );
                Outcome::Failed
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown cause".to_owned());
                logging::error(
                    &anyhow!("`{}` panicked: {}", label, reason),
                    Some(Section::InteractionEvent),
                );
                Outcome::Failed
            }
        }
    }
}
