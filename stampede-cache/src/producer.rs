//! Producers: the functions that regenerate cached values.
//!
//! A producer receives the argument list bound at registration time and
//! returns the fresh value. Hosts that configure caches from data (config
//! files, admin panels) can refer to producers by name through a
//! [`ProducerRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use stampede_core::error::{Result, StampedeError};

/// Shared, thread-safe producer function.
pub type ProducerFn<T> = Arc<dyn Fn(&[Value]) -> anyhow::Result<T> + Send + Sync>;

/// A producer together with the arguments it is invoked with.
pub(crate) struct BoundProducer<T> {
    pub(crate) name: Option<String>,
    pub(crate) func: ProducerFn<T>,
    pub(crate) args: Vec<Value>,
}

impl<T> BoundProducer<T> {
    pub(crate) fn call(&self) -> anyhow::Result<T> {
        (self.func)(&self.args)
    }
}

impl<T> Clone for BoundProducer<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
            args: self.args.clone(),
        }
    }
}

impl<T> fmt::Debug for BoundProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProducer")
            .field("name", &self.name.as_deref().unwrap_or("<closure>"))
            .field("args", &self.args)
            .finish()
    }
}

/// Named producers, resolvable at configuration time.
///
/// Thread-safe; producers can be registered while caches are in use.
pub struct ProducerRegistry<T> {
    producers: RwLock<HashMap<String, ProducerFn<T>>>,
}

impl<T> ProducerRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            producers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `func` under `name`, replacing any previous producer of that name.
    pub fn register<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.producers.write().insert(name.into(), Arc::new(func));
    }

    /// Removes the producer registered under `name`.
    pub fn unregister(&self, name: &str) {
        self.producers.write().remove(name);
    }

    /// Looks up a producer by name.
    ///
    /// Fails with [`StampedeError::UncallableProducer`] if the name is empty
    /// or nothing is registered under it.
    pub fn resolve(&self, name: &str) -> Result<ProducerFn<T>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StampedeError::UncallableProducer(
                "producer name is empty".into(),
            ));
        }
        self.producers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StampedeError::UncallableProducer(format!("no producer named '{name}'")))
    }

    /// Returns true if a producer is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.producers.read().contains_key(name.trim())
    }

    /// Returns the number of registered producers.
    pub fn len(&self) -> usize {
        self.producers.read().len()
    }

    /// Returns true if no producers are registered.
    pub fn is_empty(&self) -> bool {
        self.producers.read().is_empty()
    }
}

impl<T> Default for ProducerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
