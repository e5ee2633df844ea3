//! # Pluggable Storage Backends
//!
//! Every storage engine the cache can route to implements the
//! [`CacheBackend`] contract: a synchronous item-based API with miss
//! detection, deferred writes plus a single commit, and maintenance
//! hooks. Synchronous is deliberate, the deferred-write queue is flushed
//! from `Drop` and a destructor cannot await.
//!
//! ## Features
//!
//! - **Item exchange**: [`CacheItem`] carries hit/miss state, expiration
//!   and the invalidation policy in one unit
//! - **Deferred writes**: `save_deferred` + `commit` batch round trips
//! - **Composites**: backends may expose persistent/non-persistent
//!   sub-backends for selective clearing
//! - **Registry**: maps configured backend identifiers to factories,
//!   falling back to the built-in ephemeral backend for unknown ids
//!
//! Two implementations ship with the crate: [`EphemeralBackend`]
//! (in-process, never durable) and [`CompositeBackend`] (ordered
//! sub-backends with read-through promotion).

pub mod composite;
pub mod ephemeral;
pub mod item;

pub use composite::CompositeBackend;
pub use ephemeral::EphemeralBackend;
pub use item::{CacheItem, InvalidationPolicy};

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::types::StorageKey;

/// Capability contract for a storage engine
///
/// Object safe and `Send + Sync`, so adapters hold `Box<dyn CacheBackend>`.
/// Errors mean the backend itself failed; an absent key is never an
/// error, it is an item whose `is_miss` returns true.
pub trait CacheBackend: Send + Sync {
    /// Short identifier used in log output
    fn name(&self) -> &str;

    /// True when entries outlive the process
    fn is_persistent(&self) -> bool;

    /// Whether a live entry exists for `key`
    fn has_item(&self, key: &str) -> Result<bool>;

    /// Fetch the item for `key`; a miss is an item without a value
    fn item(&self, key: &str) -> Result<CacheItem>;

    /// Fetch items for several keys in one call, returned in input order
    fn items(&self, keys: &[StorageKey]) -> Result<Vec<CacheItem>>;

    /// Write an item immediately
    fn save(&self, item: CacheItem) -> Result<bool>;

    /// Queue an item to be written by the next `commit`
    fn save_deferred(&self, item: CacheItem) -> Result<bool>;

    /// Flush all queued writes
    fn commit(&self) -> Result<bool>;

    /// Remove the entry for `key`; true when the key is absent afterwards
    fn delete_item(&self, key: &str) -> Result<bool>;

    /// Drop every entry
    fn clear(&self) -> Result<bool>;

    /// Backend-specific maintenance, e.g. sweeping expired entries
    ///
    /// Backends with nothing to maintain return `Ok(true)`.
    fn purge(&self) -> Result<bool>;

    /// Composite capability: the ordered sub-backends, if any
    fn sub_backends(&self) -> &[Box<dyn CacheBackend>] {
        &[]
    }
}

/// Factory closure building a backend from its configured argument map
pub type BackendFactory =
    Box<dyn Fn(&Map<String, Value>) -> Result<Box<dyn CacheBackend>> + Send + Sync>;

/// Identifier of the built-in ephemeral backend
pub const EPHEMERAL_BACKEND: &str = "ephemeral";

/// Maps backend identifiers from configuration to factories
///
/// The `ephemeral` backend is always registered. Applications add their
/// own engines (file, memcached-like, ...) under the identifier their
/// configuration names.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Registry with only the built-in ephemeral backend
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(EPHEMERAL_BACKEND, |_args| {
            Ok(Box::new(EphemeralBackend::new()) as Box<dyn CacheBackend>)
        });
        registry
    }

    /// Register a factory under `id`, replacing any previous one
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn(&Map<String, Value>) -> Result<Box<dyn CacheBackend>> + Send + Sync + 'static,
    {
        debug!(backend = id, "Registered cache backend factory");
        self.factories.insert(id.to_string(), Box::new(factory));
    }

    /// True when a factory exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Build the backend registered under `id`
    pub fn build(&self, id: &str, args: &Map<String, Value>) -> Result<Box<dyn CacheBackend>> {
        match self.factories.get(id) {
            Some(factory) => factory(args),
            None => Err(CacheError::UnknownBackend(id.to_string())),
        }
    }

    /// Build `id`, falling back to the ephemeral backend when the id is
    /// unknown or its factory fails
    ///
    /// A cache that silently degrades to process-local storage beats one
    /// that refuses to start, so misconfiguration is logged, not fatal.
    pub fn build_or_fallback(&self, id: &str, args: &Map<String, Value>) -> Box<dyn CacheBackend> {
        let id = if id.is_empty() { EPHEMERAL_BACKEND } else { id };
        match self.build(id, args) {
            Ok(backend) => backend,
            Err(e) => {
                warn!(
                    backend = id,
                    error = %e,
                    "Falling back to ephemeral cache backend"
                );
                Box::new(EphemeralBackend::new())
            }
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
