use std::collections::HashMap;
use std::sync::Arc;

/// Callbacks the bot knows about, keyed by the name handler manifests refer to them by.
///
/// Used as `Registry<dyn Exec>` for commands, buttons and select menus, and as
/// `Registry<dyn Listener<A>>` for gateway events.
pub struct Registry<T: ?Sized> {
    map: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback, replacing any previous one with the same key
    pub fn insert(&mut self, key: impl Into<String>, value: Arc<T>) -> &mut Self {
        self.map.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.map.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greet: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;
    impl Greet for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    struct Salut;
    impl Greet for Salut {
        fn greet(&self) -> &'static str {
            "salut"
        }
    }

    #[test]
    fn trait_objects_by_key() {
        let mut registry: Registry<dyn Greet> = Registry::new();
        registry.insert("greet", Arc::new(Hello));
        assert_eq!(registry.get("greet").map(|g| g.greet()), Some("hello"));

        registry.insert("greet", Arc::new(Salut));
        assert_eq!(registry.get("greet").map(|g| g.greet()), Some("salut"));
        assert!(registry.get("other").is_none());
    }
}
