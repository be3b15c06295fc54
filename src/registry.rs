use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{EventKind, Handler, Result, handler_fn};

type HandlerMap<K> = HashMap<K, Arc<dyn Handler<K>>>;

/// Routing table mapping each event kind to at most one handler.
///
/// Cloning a registry shares the underlying table: a handler registered
/// through any clone is seen by the next lookup made by the dispatcher.
/// Registering a second handler for the same kind replaces the first.
///
/// The table is guarded by a read-write lock held only for the map access;
/// [`lookup`](Self::lookup) hands out an `Arc` so the handler runs without
/// the lock.
pub struct HandlerRegistry<K: EventKind> {
    handlers: Arc<RwLock<HandlerMap<K>>>,
}

impl<K: EventKind> HandlerRegistry<K> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Associate `handler` with `kind`, replacing any earlier handler.
    ///
    /// Returns `true` when a previous handler was replaced.
    pub fn register<H>(&self, kind: K, handler: H) -> bool
    where
        H: Handler<K> + 'static,
    {
        self.register_arc(kind, Arc::new(handler))
    }

    /// Same as [`register`](Self::register) for an already shared handler.
    pub fn register_arc(&self, kind: K, handler: Arc<dyn Handler<K>>) -> bool {
        let replaced = self.write().insert(kind, handler).is_some();
        if replaced {
            tracing::debug!(kind = %kind.name(), "handler replaced");
        } else {
            tracing::debug!(kind = %kind.name(), "handler registered");
        }
        replaced
    }

    /// Register an async closure for `kind`. See [`handler_fn`].
    pub fn register_fn<F, Fut>(&self, kind: K, f: F) -> bool
    where
        F: Fn(K, Arc<str>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(kind, handler_fn(f))
    }

    /// Remove the handler for `kind`. Events of that kind become unrouted.
    pub fn unregister(&self, kind: K) -> bool {
        self.write().remove(&kind).is_some()
    }

    /// The handler currently registered for `kind`, if any.
    pub fn lookup(&self, kind: K) -> Option<Arc<dyn Handler<K>>> {
        self.read().get(&kind).cloned()
    }

    pub fn contains(&self, kind: K) -> bool {
        self.read().contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Kinds that currently have a handler, in no particular order.
    pub fn kinds(&self) -> Vec<K> {
        self.read().keys().copied().collect()
    }

    // Critical sections never run user code, so a poisoned lock still holds a
    // consistent map.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HandlerMap<K>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HandlerMap<K>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: EventKind> Clone for HandlerRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<K: EventKind> Default for HandlerRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EventKind> std::fmt::Debug for HandlerRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
