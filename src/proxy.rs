//! # Cache Proxy
//!
//! The caller-facing façade. A [`CacheProxy`] owns two
//! [`CacheAdapter`]s, one per tier, a key generator, and the registry
//! of groups routed to the non-persistent tier. Every verb resolves the
//! logical `(key, group)` pair to a storage key, picks the tier with an
//! O(1) membership test, and delegates to that tier's adapter.
//!
//! ## Features
//!
//! - **Full verb surface**: get/set/add/replace/delete/incr/decr, their
//!   `*_multiple` batch variants, flush, flush_runtime, flush_group
//! - **Tier routing**: groups registered non-persistent never touch
//!   durable storage
//! - **Tenant scoping**: delegated to the key generator when it has the
//!   capability, a silent no-op when it does not
//! - **Suspended additions**: a process-wide switch that fails `add`
//!   before any key is generated, for bulk imports
//! - **Aggregate counters**: hit/miss totals summed over both tiers
//!
//! Construction is explicit, one proxy per process or request context,
//! handed to consumers by the caller. [`CacheProxy::from_config`] wires
//! the standard layout: an ephemeral non-persistent tier next to the
//! configured persistent backend, fronted by an in-process layer when
//! memoization is on.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::adapter::CacheAdapter;
use crate::backend::{BackendRegistry, CompositeBackend, EphemeralBackend};
use crate::config::ProxyConfig;
use crate::keygen::{group_or_default, DefaultKeyGenerator, KeyGen};
use crate::lock;
use crate::types::{CacheStats, CacheValue, StorageKey, Tier};

const SOURCE: &str = "proxy";

/// Two-tier cache façade with group routing and tenant scoping
pub struct CacheProxy {
    non_persistent: CacheAdapter,
    persistent: CacheAdapter,
    keygen: Box<dyn KeyGen>,
    non_persistent_groups: RwLock<HashSet<String>>,
    additions_suspended: AtomicBool,
}

impl CacheProxy {
    /// Assemble a proxy from its parts
    pub fn new(
        non_persistent: CacheAdapter,
        persistent: CacheAdapter,
        keygen: Box<dyn KeyGen>,
    ) -> Self {
        info!(
            non_persistent = non_persistent.backend_name(),
            persistent = persistent.backend_name(),
            durable = persistent.is_persistent(),
            "Initialized cache proxy"
        );
        Self {
            non_persistent,
            persistent,
            keygen,
            non_persistent_groups: RwLock::new(HashSet::new()),
            additions_suspended: AtomicBool::new(false),
        }
    }

    /// Standard wiring from resolved configuration
    ///
    /// Uses the built-in backend registry and the single-tenant key
    /// generator; see [`from_config_with`](Self::from_config_with) for
    /// custom backends or tenant scoping.
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::from_config_with(config, &BackendRegistry::new(), Box::new(DefaultKeyGenerator))
    }

    /// Wiring from configuration with a caller-supplied registry and
    /// key generator
    ///
    /// When memoization is enabled and the configured backend is a
    /// plain durable one, it gets fronted by an in-process layer so
    /// repeated reads stay off the slow path.
    pub fn from_config_with(
        config: &ProxyConfig,
        registry: &BackendRegistry,
        keygen: Box<dyn KeyGen>,
    ) -> Self {
        let backend = registry.build_or_fallback(&config.backend, &config.backend_args);
        let plain = backend.sub_backends().is_empty();
        let durable = backend.is_persistent();
        let backend = if config.use_memoization && plain && durable {
            info!(
                backend = backend.name(),
                "Fronting persistent backend with an in-process layer"
            );
            Box::new(CompositeBackend::staggered(
                Box::new(EphemeralBackend::new()),
                backend,
            ))
        } else {
            backend
        };

        Self::new(
            CacheAdapter::new(Box::new(EphemeralBackend::new()), false),
            CacheAdapter::new(backend, config.use_memoization),
            keygen,
        )
    }

    /// Tier a group routes to, an O(1) membership test
    pub fn choose_tier(&self, group: &str) -> Tier {
        let group = group_or_default(group);
        let groups = lock::rw_read(&self.non_persistent_groups, SOURCE, "choose_tier");
        if groups.contains(group) {
            Tier::NonPersistent
        } else {
            Tier::Persistent
        }
    }

    fn adapter(&self, tier: Tier) -> &CacheAdapter {
        match tier {
            Tier::NonPersistent => &self.non_persistent,
            Tier::Persistent => &self.persistent,
        }
    }

    fn route(&self, group: &str) -> &CacheAdapter {
        self.adapter(self.choose_tier(group))
    }

    /// Read the value stored under `(key, group)`
    pub fn get(&self, key: &str, group: &str) -> Option<CacheValue> {
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).get(&storage_key)
    }

    /// Write unconditionally
    pub fn set(&self, key: &str, value: CacheValue, group: &str, expire_secs: u64) -> bool {
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).set(&storage_key, value, expire_secs)
    }

    /// Write only when the key is absent
    ///
    /// Fails outright while additions are suspended; that check runs
    /// before any key generation.
    pub fn add(&self, key: &str, value: CacheValue, group: &str, expire_secs: u64) -> bool {
        if self.additions_suspended.load(Ordering::Relaxed) {
            return false;
        }
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).add(&storage_key, value, expire_secs)
    }

    /// Write only when the key is already present
    pub fn replace(&self, key: &str, value: CacheValue, group: &str, expire_secs: u64) -> bool {
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).replace(&storage_key, value, expire_secs)
    }

    /// Remove the value stored under `(key, group)`
    pub fn delete(&self, key: &str, group: &str) -> bool {
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).delete(&storage_key)
    }

    /// Add `offset` to a stored integer, returning the new value
    pub fn incr(&self, key: &str, offset: i64, group: &str) -> Option<i64> {
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).incr(&storage_key, offset)
    }

    /// Subtract `offset` from a stored integer, returning the new value
    pub fn decr(&self, key: &str, offset: i64, group: &str) -> Option<i64> {
        let group = group_or_default(group);
        let storage_key = self.keygen.create(key, group);
        self.route(group).decr(&storage_key, offset)
    }

    /// Batch read; the result map is keyed by the original logical keys
    ///
    /// Input keys are deduplicated. All keys share `group` and therefore
    /// one tier.
    pub fn get_multiple(&self, keys: &[&str], group: &str) -> HashMap<String, Option<CacheValue>> {
        let group = group_or_default(group);
        let pairs = self.storage_pairs(keys, group);
        let storage_keys: Vec<StorageKey> =
            pairs.iter().map(|(_, storage)| storage.clone()).collect();

        let values = self.route(group).get_multiple(&storage_keys);
        pairs
            .into_iter()
            .zip(values)
            .map(|((logical, _), value)| (logical, value))
            .collect()
    }

    /// Batch write, one deferred commit; keyed by original logical keys
    pub fn set_multiple(
        &self,
        entries: &[(&str, CacheValue)],
        group: &str,
        expire_secs: u64,
    ) -> HashMap<String, bool> {
        let group = group_or_default(group);
        let (logical, storage) = self.storage_entries(entries, group);
        let results = self.route(group).set_multiple(&storage, expire_secs);
        logical.into_iter().zip(results).collect()
    }

    /// Batch `add`; suspended additions fail the whole batch up front
    pub fn add_multiple(
        &self,
        entries: &[(&str, CacheValue)],
        group: &str,
        expire_secs: u64,
    ) -> HashMap<String, bool> {
        if self.additions_suspended.load(Ordering::Relaxed) {
            return entries
                .iter()
                .map(|(key, _)| ((*key).to_string(), false))
                .collect();
        }
        let group = group_or_default(group);
        let (logical, storage) = self.storage_entries(entries, group);
        let results = self.route(group).add_multiple(&storage, expire_secs);
        logical.into_iter().zip(results).collect()
    }

    /// Batch delete; keyed by original logical keys
    pub fn delete_multiple(&self, keys: &[&str], group: &str) -> HashMap<String, bool> {
        let group = group_or_default(group);
        let pairs = self.storage_pairs(keys, group);
        let storage_keys: Vec<StorageKey> =
            pairs.iter().map(|(_, storage)| storage.clone()).collect();

        let results = self.route(group).delete_multiple(&storage_keys);
        pairs
            .into_iter()
            .zip(results)
            .map(|((logical, _), ok)| (logical, ok))
            .collect()
    }

    /// Read and deserialize into `T`
    ///
    /// A value that no longer matches `T` behaves like a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, group: &str) -> Option<T> {
        let value = self.get(key, group)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "Cached value failed to deserialize");
                None
            }
        }
    }

    /// Serialize `value` and write it
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T, group: &str, expire_secs: u64) -> bool {
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, json, group, expire_secs),
            Err(e) => {
                warn!(key, error = %e, "Value failed to serialize for caching");
                false
            }
        }
    }

    /// Route `groups` to the non-persistent tier from now on
    ///
    /// Idempotent merge; returns the full updated set. Takes effect for
    /// all subsequent calls immediately.
    pub fn add_non_persistent_groups(&self, groups: &[&str]) -> HashSet<String> {
        let mut registry =
            lock::rw_write(&self.non_persistent_groups, SOURCE, "add_non_persistent_groups");
        for group in groups {
            registry.insert(group_or_default(group).to_string());
        }
        registry.clone()
    }

    /// Register tenant-global groups on the key generator
    ///
    /// Returns false without side effects when the generator has no
    /// tenant capability.
    pub fn add_global_groups(&self, groups: &[&str]) -> bool {
        match self.keygen.as_tenant_aware() {
            Some(tenant_aware) => {
                tenant_aware.add_global_groups(groups);
                true
            }
            None => false,
        }
    }

    /// Switch the active tenant on the key generator
    ///
    /// A no-op returning false when the generator has no tenant
    /// capability.
    pub fn switch_tenant(&self, tenant_id: u64) -> bool {
        match self.keygen.as_tenant_aware() {
            Some(tenant_aware) => tenant_aware.switch_tenant(tenant_id),
            None => false,
        }
    }

    /// Toggle the process-wide "cache additions suspended" switch
    pub fn suspend_additions(&self, suspended: bool) {
        self.additions_suspended.store(suspended, Ordering::Relaxed);
    }

    /// Whether additions are currently suspended
    pub fn additions_suspended(&self) -> bool {
        self.additions_suspended.load(Ordering::Relaxed)
    }

    /// Clear both tiers entirely
    pub fn flush(&self) -> bool {
        self.non_persistent.clear();
        self.persistent.clear();
        info!("Flushed both cache tiers");
        true
    }

    /// Clear runtime state only: the whole non-persistent tier plus any
    /// non-persistent layers inside the persistent tier's backend
    pub fn flush_runtime(&self) -> bool {
        self.non_persistent.clear();
        self.persistent.clear_non_persistent();
        info!("Flushed runtime cache state");
        true
    }

    /// Clear the tier `group` routes to
    ///
    /// Coarse by construction: backends keep no per-group index, so the
    /// whole tier goes, not just the group's entries.
    pub fn flush_group(&self, group: &str) -> bool {
        let group = group_or_default(group);
        let tier = self.choose_tier(group);
        self.adapter(tier).clear();
        info!(group, %tier, "Flushed cache tier for group");
        true
    }

    /// Run maintenance on both tiers; true only when both succeed
    pub fn purge(&self) -> bool {
        let non_persistent = self.non_persistent.purge();
        let persistent = self.persistent.purge();
        non_persistent && persistent
    }

    /// Total hits across both tiers
    pub fn hits(&self) -> u64 {
        self.non_persistent.hits() + self.persistent.hits()
    }

    /// Total misses across both tiers
    pub fn misses(&self) -> u64 {
        self.non_persistent.misses() + self.persistent.misses()
    }

    /// Aggregate statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let non_persistent = self.non_persistent.stats();
        let persistent = self.persistent.stats();

        let mut non_persistent_groups: Vec<String> =
            lock::rw_read(&self.non_persistent_groups, SOURCE, "stats")
                .iter()
                .cloned()
                .collect();
        non_persistent_groups.sort();

        let mut global_groups: Vec<String> = self
            .keygen
            .as_tenant_aware()
            .map(|tenant_aware| tenant_aware.global_groups().into_iter().collect())
            .unwrap_or_default();
        global_groups.sort();

        CacheStats {
            hits: non_persistent.hits + persistent.hits,
            misses: non_persistent.misses + persistent.misses,
            non_persistent,
            persistent,
            non_persistent_groups,
            global_groups,
        }
    }

    /// Backend name behind the persistent tier, for diagnostics
    pub fn persistent_backend_name(&self) -> &str {
        self.persistent.backend_name()
    }

    /// Backend name behind the non-persistent tier, for diagnostics
    pub fn non_persistent_backend_name(&self) -> &str {
        self.non_persistent.backend_name()
    }

    /// Deduplicate logical keys and pair each with its storage key
    fn storage_pairs(&self, keys: &[&str], group: &str) -> Vec<(String, StorageKey)> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::with_capacity(keys.len());
        for key in keys {
            if seen.insert(*key) {
                pairs.push(((*key).to_string(), self.keygen.create(key, group)));
            }
        }
        pairs
    }

    /// Deduplicate write entries, last value per key winning
    fn storage_entries(
        &self,
        entries: &[(&str, CacheValue)],
        group: &str,
    ) -> (Vec<String>, Vec<(StorageKey, CacheValue)>) {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut logical: Vec<String> = Vec::new();
        let mut storage: Vec<(StorageKey, CacheValue)> = Vec::new();
        for (key, value) in entries {
            match index.get(key) {
                Some(&position) => storage[position].1 = value.clone(),
                None => {
                    index.insert(key, storage.len());
                    logical.push((*key).to_string());
                    storage.push((self.keygen.create(key, group), value.clone()));
                }
            }
        }
        (logical, storage)
    }
}
