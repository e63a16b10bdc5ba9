//! Method registry.
//!
//! Built once at startup and shared read-only. Each name resolves, in one
//! lookup, to a descriptor holding either a synchronous or an asynchronous
//! handler.

use crate::continuation::Continuation;
use crate::handlers;
use crate::protocol::HandlerError;
use seedbox_core::fields::Style;
use seedbox_core::Session;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub type Params = Map<String, Value>;

/// Output of a synchronous handler.
pub type HandlerResult = Result<Map<String, Value>, HandlerError>;

/// Runs to completion while the session lock is held.
pub type SyncHandler = fn(&mut Session, &Params, Style) -> HandlerResult;

/// Starts work under the session lock and completes the continuation later.
pub type AsyncHandler = fn(&mut Session, &Params, Continuation);

#[derive(Clone, Copy)]
pub enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Sync"),
            Handler::Async(_) => f.write_str("Async"),
        }
    }
}

/// One registered method.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub handler: Handler,
    /// Methods without side effects are skipped for notifications.
    pub has_side_effects: bool,
}

impl MethodDescriptor {
    pub const fn sync(name: &'static str, handler: SyncHandler, has_side_effects: bool) -> Self {
        Self {
            name,
            handler: Handler::Sync(handler),
            has_side_effects,
        }
    }

    pub const fn asynchronous(
        name: &'static str,
        handler: AsyncHandler,
        has_side_effects: bool,
    ) -> Self {
        Self {
            name,
            handler: Handler::Async(handler),
            has_side_effects,
        }
    }
}

/// Immutable name → descriptor table.
#[derive(Debug, Default)]
pub struct Registry {
    methods: HashMap<&'static str, MethodDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every method the daemon serves.
    pub fn standard() -> Self {
        handlers::METHODS
            .iter()
            .fold(Self::new(), |registry, method| registry.with(*method))
    }

    /// Add a method, replacing any previous one of the same name.
    pub fn with(mut self, method: MethodDescriptor) -> Self {
        self.methods.insert(method.name, method);
        self
    }

    /// Resolve a method name. Legacy kebab-case names map to the same entry.
    pub fn lookup(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods
            .get(name)
            .or_else(|| self.methods.get(name.replace('-', "_").as_str()))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), handlers::METHODS.len());

        let get = registry.lookup("torrent-get").unwrap();
        assert_eq!(get.name, "torrent_get");
        assert!(!get.has_side_effects);
        assert!(matches!(get.handler, Handler::Sync(_)));

        let add = registry.lookup("torrent_add").unwrap();
        assert!(add.has_side_effects);
        assert!(matches!(add.handler, Handler::Async(_)));

        assert!(!registry.lookup("port-test").unwrap().has_side_effects);
        assert!(registry.lookup("group_get").is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup("session_get").is_none());
    }
}
