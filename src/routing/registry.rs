//! Handler registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::http::{Request, ResponseWriter};

/// Signature every handler has: borrow the writer and the request for the
/// duration of the returned future.
pub type HandlerFn =
    dyn for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a, ()> + Send + Sync;

/// A registered handler, shared by all workers.
pub type BoxedHandler = Arc<HandlerFn>;

/// Registry key: exact method and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId {
    pub method: String,
    pub path: String,
}

impl HandlerId {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Error type for registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler already exists for this method and path.
    #[error("handler already registered for {0}")]
    Duplicate(HandlerId),
}

/// Lookup table from (method, path) to handler.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<HandlerId, BoxedHandler>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` and `path`.
    ///
    /// Fails if a handler is already registered for the same pair; the existing
    /// handler is kept.
    ///
    /// ```no_run
    /// # use simple_server::routing::Registry;
    /// let mut registry = Registry::new();
    /// registry
    ///     .register("POST", "/echo", |w, r| {
    ///         Box::pin(async move {
    ///             let _ = w.write(&r.payload).await;
    ///         })
    ///     })
    ///     .unwrap();
    /// ```
    pub fn register<H>(
        &mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError>
    where
        H: for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        let id = HandlerId::new(method, path);
        if self.handlers.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }

        tracing::debug!(handler = %id, "Handler registered");
        self.handlers.insert(id, Arc::new(handler));
        Ok(())
    }

    /// Find the handler registered for exactly `method` and `path`.
    pub fn lookup(&self, method: &str, path: &str) -> Option<&BoxedHandler> {
        self.handlers.get(&HandlerId::new(method, path))
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
