//! Fixtures shared by the unit tests: a throwaway handler tree, callbacks that report through
//! their reply, and fakes for Discord.

use crate::api::{CommandApi, RemoteCommand, Scope};
use crate::config::Config;
use crate::context::Call;
use crate::definition::{CommandBody, Exec};
use crate::events::Listener;
use crate::inbound::{Inbound, InteractionKind};
use crate::registry::Registry;
use crate::sucrose::Sucrose;
use anyhow::{bail, Result};
use serenity::all::{CommandId, CreateInteractionResponseMessage, GuildId, Permissions, UserId};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Handler tree in a temporary folder
pub struct Tree {
    dir: TempDir,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, text: &str) {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    /// Chat input command `name` bound to `handler`
    pub fn command(&self, guild: Option<u64>, name: &str, handler: &str) {
        let scope = match guild {
            Some(id) => format!("guilds/{}", id),
            None => "global".to_owned(),
        };
        self.write(
            &format!("commands/{}/{}.toml", scope, name),
            &format!(
                "handler = '{}'\n[body]\nname = '{}'\ndescription = 'The {} command'",
                handler, name, name
            ),
        );
    }

    /// Sub command or group file
    pub fn sub(&self, relative: &str, name: &str, kind: &str, handler: Option<&str>) {
        let handler = handler
            .map(|h| format!("handler = '{}'\n", h))
            .unwrap_or_default();
        self.write(
            relative,
            &format!(
                "{}[option]\nname = '{}'\ndescription = 'The {} option'\ntype = '{}'",
                handler, name, name, kind
            ),
        );
    }
}

/// Counts its calls
#[derive(Default)]
pub struct Recorder {
    pub calls: AtomicUsize,
}

#[serenity::async_trait]
impl Exec for Recorder {
    async fn exec(&self, _call: &Call<'_>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replies with its own key
struct Echo(&'static str);

#[serenity::async_trait]
impl Exec for Echo {
    async fn exec(&self, call: &Call<'_>) -> Result<()> {
        call.reply(self.0).await
    }
}

struct Failing;

#[serenity::async_trait]
impl Exec for Failing {
    async fn exec(&self, _call: &Call<'_>) -> Result<()> {
        bail!("callback failed")
    }
}

struct Panicking;

#[serenity::async_trait]
impl Exec for Panicking {
    async fn exec(&self, _call: &Call<'_>) -> Result<()> {
        panic!("callback panicked")
    }
}

/// `v1` and `v2` reply with their key, `failing` errors, `panicking` panics
pub fn execs() -> Registry<dyn Exec> {
    let mut execs: Registry<dyn Exec> = Registry::new();
    execs
        .insert("v1", Arc::new(Echo("v1")))
        .insert("v2", Arc::new(Echo("v2")))
        .insert("failing", Arc::new(Failing))
        .insert("panicking", Arc::new(Panicking));
    execs
}

/// Bot over `tree`, with test callbacks and no listeners
pub fn sucrose(tree: &Tree, api: Arc<dyn CommandApi>) -> Sucrose {
    sucrose_with(tree, execs(), api)
}

pub fn sucrose_with(tree: &Tree, execs: Registry<dyn Exec>, api: Arc<dyn CommandApi>) -> Sucrose {
    let mut cfg = Config::default();
    cfg.paths.production = false;
    cfg.paths.development = tree.root().to_path_buf();

    Sucrose::new(cfg, execs, Registry::new(), api)
}

/// What listeners heard, as `key:args`
#[derive(Clone, Default)]
pub struct Heard(Arc<Mutex<Vec<String>>>);

impl Heard {
    fn push(&self, line: String) {
        self.0.lock().unwrap().push(line);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

struct Named {
    key: &'static str,
    heard: Heard,
    fail: bool,
}

#[serenity::async_trait]
impl Listener<String> for Named {
    async fn listen(&self, args: &String) -> Result<()> {
        self.heard.push(format!("{}:{}", self.key, args));
        if self.fail {
            bail!("listener failed");
        }
        Ok(())
    }
}

/// `first` and `second` record, `failing` records then errors
pub fn listeners(heard: &Heard) -> Registry<dyn Listener<String>> {
    let named = |key, fail| {
        Arc::new(Named {
            key,
            heard: heard.clone(),
            fail,
        })
    };

    let mut listeners: Registry<dyn Listener<String>> = Registry::new();
    listeners
        .insert("first", named("first", false))
        .insert("second", named("second", false))
        .insert("failing", named("failing", true));
    listeners
}

#[derive(Default)]
struct Remote {
    next_id: u64,
    commands: Vec<RemoteCommand>,
    calls: usize,
}

/// In-memory command endpoints.  Counts `set` and `create` calls.
#[derive(Default)]
pub struct FakeApi {
    remote: Mutex<Remote>,
    failing: Vec<String>,
}

impl FakeApi {
    /// Creating any of `names` fails
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn names(&self, scope: Scope) -> Vec<String> {
        let mut names: Vec<_> = self
            .remote
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|c| c.scope == scope)
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn calls(&self) -> usize {
        self.remote.lock().unwrap().calls
    }

    fn insert(&self, remote: &mut Remote, scope: Scope, body: &CommandBody) -> RemoteCommand {
        remote
            .commands
            .retain(|c| !(c.scope == scope && c.name == body.name));
        remote.next_id += 1;
        let command = RemoteCommand {
            id: CommandId::new(remote.next_id),
            name: body.name.clone(),
            scope,
        };
        remote.commands.push(command.clone());
        command
    }
}

#[serenity::async_trait]
impl CommandApi for FakeApi {
    async fn set(&self, scope: Scope, bodies: &[CommandBody]) -> Result<Vec<RemoteCommand>> {
        let mut remote = self.remote.lock().unwrap();
        remote.calls += 1;
        remote.commands.retain(|c| c.scope != scope);
        Ok(bodies
            .iter()
            .map(|body| self.insert(&mut remote, scope, body))
            .collect())
    }

    async fn create(&self, scope: Scope, body: &CommandBody) -> Result<RemoteCommand> {
        let mut remote = self.remote.lock().unwrap();
        remote.calls += 1;
        if self.failing.contains(&body.name) {
            bail!("Discord rejected `{}`", body.name);
        }
        Ok(self.insert(&mut remote, scope, body))
    }

    async fn fetch_all(&self, scope: Scope) -> Result<Vec<RemoteCommand>> {
        let remote = self.remote.lock().unwrap();
        Ok(remote
            .commands
            .iter()
            .filter(|c| c.scope == scope)
            .cloned()
            .collect())
    }

    async fn delete(&self, scope: Scope, id: CommandId) -> Result<()> {
        let mut remote = self.remote.lock().unwrap();
        remote.commands.retain(|c| !(c.scope == scope && c.id == id));
        Ok(())
    }
}

/// Interaction built by hand.  Keeps the content of every response.
pub struct FakeInteraction {
    kind: InteractionKind,
    name: String,
    guild: Option<GuildId>,
    group: Option<String>,
    sub: Option<String>,
    app: Option<Permissions>,
    member: Option<Permissions>,
    values: Vec<String>,
    options: Vec<(String, String)>,
    replies: Mutex<Vec<String>>,
}

impl FakeInteraction {
    fn new(kind: InteractionKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            guild: None,
            group: None,
            sub: None,
            app: None,
            member: None,
            values: Vec::new(),
            options: Vec::new(),
            replies: Mutex::new(Vec::new()),
        }
    }

    pub fn command(name: &str) -> Self {
        Self::new(InteractionKind::ChatInput, name)
    }

    pub fn button(custom_id: &str) -> Self {
        Self::new(InteractionKind::Button, custom_id)
    }

    pub fn select(custom_id: &str, values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|s| s.to_string()).collect(),
            ..Self::new(InteractionKind::SelectMenu, custom_id)
        }
    }

    pub fn in_guild(mut self, id: u64) -> Self {
        self.guild = Some(GuildId::new(id));
        self
    }

    pub fn group(mut self, name: &str) -> Self {
        self.group = Some(name.to_owned());
        self
    }

    pub fn sub(mut self, name: &str) -> Self {
        self.sub = Some(name.to_owned());
        self
    }

    pub fn app(mut self, permissions: Permissions) -> Self {
        self.app = Some(permissions);
        self
    }

    pub fn member(mut self, permissions: Permissions) -> Self {
        self.member = Some(permissions);
        self
    }

    pub fn option(mut self, name: &str, value: &str) -> Self {
        self.options.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[serenity::async_trait]
impl Inbound for FakeInteraction {
    fn kind(&self) -> Option<InteractionKind> {
        Some(self.kind)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.guild
    }

    fn user_id(&self) -> Option<UserId> {
        Some(UserId::new(42))
    }

    fn user_name(&self) -> Option<&str> {
        Some("sucrose")
    }

    fn sub_command_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn sub_command(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    fn app_permissions(&self) -> Option<Permissions> {
        self.app
    }

    fn member_permissions(&self) -> Option<Permissions> {
        self.member
    }

    fn string_option(&self, name: &str) -> Option<String> {
        self.options
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn values(&self) -> Vec<String> {
        self.values.clone()
    }

    async fn respond(&self, message: CreateInteractionResponseMessage) -> Result<()> {
        let json = serde_json::to_value(&message)?;
        let content = json["content"].as_str().unwrap_or_default().to_owned();
        self.replies.lock().unwrap().push(content);
        Ok(())
    }
}
