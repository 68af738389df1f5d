//! One listener per gateway event, bound from `events/<name>/handler.toml`

use crate::error::{Batch, Code, DomainError};
use crate::logging::{self, progress_bar, Section};
use crate::registry::Registry;
use crate::{log_info, manifest};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const READY: &str = "ready";

/// Code run when a gateway event is emitted
#[serenity::async_trait]
pub trait Listener<A>: Send + Sync {
    async fn listen(&self, args: &A) -> Result<()>;
}

pub struct Binding<A> {
    pub key: String,
    pub path: PathBuf,
    listener: Arc<dyn Listener<A>>,
}

impl<A> Clone for Binding<A> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            path: self.path.clone(),
            listener: self.listener.clone(),
        }
    }
}

/// Binds listeners to event names.  `A` is whatever an emitted event carries.
pub struct EventManager<A> {
    dir: PathBuf,
    supported: &'static [&'static str],
    ignores: Vec<String>,
    listeners: Arc<Registry<dyn Listener<A>>>,
    bindings: RwLock<HashMap<String, Binding<A>>>,
    /// Last `ready` payload, replayed to a `ready` listener bound after the fact
    ready: RwLock<Option<A>>,
}

impl<A: Clone + Send + Sync + 'static> EventManager<A> {
    pub fn new(
        dir: impl Into<PathBuf>,
        supported: &'static [&'static str],
        ignores: Vec<String>,
        listeners: Arc<Registry<dyn Listener<A>>>,
    ) -> Self {
        Self {
            dir: dir.into(),
            supported,
            ignores,
            listeners,
            bindings: RwLock::new(HashMap::new()),
            ready: RwLock::new(None),
        }
    }

    /// Binds every event folder that isn't ignored
    pub async fn bind_all(&self) -> Batch<usize> {
        let mut batch = Batch::new(0);

        if !tokio::fs::metadata(&self.dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return batch;
        }

        let names = match self.folders().await {
            Ok(names) => names,
            Err(err) => {
                batch.fail(err);
                return batch;
            }
        };

        let total = names.len();
        for name in names {
            if self.ignores.contains(&name) {
                continue;
            }

            match self.bind(&name).await {
                Ok(()) => batch.loaded += 1,
                Err(err) => batch.fail(err),
            }
        }

        log_info!(
            Section::EventManager;
            "{} {}/{} events loaded",
            progress_bar(batch.loaded, total, 10),
            batch.loaded,
            total
        );
        batch
    }

    async fn folders(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Could not read folder `{}`", self.dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Binds one event, replacing whatever was bound to it
    pub async fn bind(&self, name: &str) -> Result<()> {
        if !self.supported.contains(&name) {
            return Err(DomainError::error(Code::EventUnsupported, name).into());
        }

        let path = self.dir.join(name).join("handler.toml");
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::error(Code::EventMissingHandler, path.display()).into())
            }
            Err(err) => {
                return Err(anyhow::Error::from(err)
                    .context(format!("Could not read `{}`", path.display())))
            }
        };

        let key = manifest::event_listener(&text, &path)?;
        let listener = self.listeners.get(&key).ok_or_else(|| {
            DomainError::error(Code::HandlerUnknown, format!("{} in {}", key, path.display()))
        })?;

        self.bindings.write().await.insert(
            name.to_owned(),
            Binding {
                key,
                path,
                listener: listener.clone(),
            },
        );

        // The gateway may have been ready before this listener existed
        if name == READY {
            let ready = self.ready.read().await.clone();
            if let Some(args) = ready {
                if let Err(err) = listener.listen(&args).await {
                    logging::error(&err, Some(Section::EventManager));
                }
            }
        }

        Ok(())
    }

    /// Drops the current listener of `name` and binds it again from disk
    pub async fn rebind(&self, name: &str) -> Result<()> {
        self.bindings.write().await.remove(name);
        self.bind(name).await?;

        if let Some(binding) = self.binding(name).await {
            log_info!(
                Section::EventManager;
                "{} rebound to `{}` from {}",
                name,
                binding.key,
                binding.path.display()
            );
        }
        Ok(())
    }

    pub async fn binding(&self, name: &str) -> Option<Binding<A>> {
        self.bindings.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    /// Hands an event to its listener.  Returns whether one was bound.  Listener errors are
    /// logged here and go no further.
    pub async fn emit(&self, name: &str, args: &A) -> bool {
        if name == READY {
            *self.ready.write().await = Some(args.clone());
        }

        let Some(binding) = self.binding(name).await else {
            return false;
        };

        if let Err(err) = binding.listener.listen(args).await {
            logging::error(
                &err.context(format!("Listener `{}` failed on {}", binding.key, name)),
                Some(Section::EventManager),
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code_of;
    use crate::testing::{listeners, Heard, Tree};

    const SUPPORTED: &[&str] = &["ready", "message", "guild_create"];

    fn manager(tree: &Tree, heard: &Heard, ignores: &[&str]) -> EventManager<String> {
        EventManager::new(
            tree.root().join("events"),
            SUPPORTED,
            ignores.iter().map(|s| s.to_string()).collect(),
            Arc::new(listeners(heard)),
        )
    }

    #[tokio::test]
    async fn binds_each_event_folder() {
        let tree = Tree::new();
        tree.write("events/message/handler.toml", "listener = 'first'");
        tree.write("events/guild_create/handler.toml", "listener = 'first'");
        tree.write("events/typing/handler.toml", "listener = 'first'");
        tree.write("events/ready/notes.txt", "");

        let heard = Heard::default();
        let manager = manager(&tree, &heard, &["guild_create"]);

        let batch = manager.bind_all().await;
        assert_eq!(batch.loaded, 1);
        let mut codes = batch.codes();
        codes.sort_by_key(|c| format!("{:?}", c));
        assert_eq!(codes, vec![Code::EventMissingHandler, Code::EventUnsupported]);

        assert!(manager.emit("message", &"hi".to_owned()).await);
        assert!(!manager.emit("guild_create", &"g".to_owned()).await);
        assert_eq!(heard.take(), vec!["first:hi"]);
    }

    #[tokio::test]
    async fn rebind_replaces_the_listener() {
        let tree = Tree::new();
        tree.write("events/message/handler.toml", "listener = 'first'");

        let heard = Heard::default();
        let manager = manager(&tree, &heard, &[]);
        manager.bind_all().await;

        tree.write("events/message/handler.toml", "listener = 'second'");
        manager.rebind("message").await.unwrap();
        manager.rebind("message").await.unwrap();

        manager.emit("message", &"hi".to_owned()).await;
        assert_eq!(heard.take(), vec!["second:hi"]);
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_listener_key() {
        let tree = Tree::new();
        tree.write("events/message/handler.toml", "listener = 'nobody'");

        let heard = Heard::default();
        let manager = manager(&tree, &heard, &[]);

        let err = manager.bind("message").await.unwrap_err();
        assert_eq!(code_of(&err), Some(Code::HandlerUnknown));
        assert!(manager.binding("message").await.is_none());
    }

    #[tokio::test]
    async fn ready_is_replayed_to_late_listeners() {
        let tree = Tree::new();
        tree.write("events/ready/handler.toml", "listener = 'first'");

        let heard = Heard::default();
        let manager = manager(&tree, &heard, &[]);

        // Gateway ready before anything was bound
        assert!(!manager.emit(READY, &"session".to_owned()).await);

        manager.bind_all().await;
        assert_eq!(heard.take(), vec!["first:session"]);

        tree.write("events/ready/handler.toml", "listener = 'second'");
        manager.rebind(READY).await.unwrap();
        assert_eq!(heard.take(), vec!["second:session"]);
    }

    #[tokio::test]
    async fn listener_errors_stay_contained() {
        let tree = Tree::new();
        tree.write("events/message/handler.toml", "listener = 'failing'");

        let heard = Heard::default();
        let manager = manager(&tree, &heard, &[]);
        manager.bind_all().await;

        assert!(manager.emit("message", &"a".to_owned()).await);
        assert!(manager.emit("message", &"b".to_owned()).await);
        assert_eq!(heard.take(), vec!["failing:a", "failing:b"]);
    }
}
