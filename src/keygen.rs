//! Storage-key generation
//!
//! Translates a logical `(key, group)` pair into the backend-qualified
//! [`StorageKey`]. Two implementations ship with the crate:
//!
//! - [`DefaultKeyGenerator`] - plain `/group/key` namespacing
//! - [`TenantKeyGenerator`] - appends the active tenant id so that
//!   tenants sharing one backend cannot see each other's entries,
//!   except for groups registered as tenant-global
//!
//! Tenant support is a capability, not a runtime type check: callers ask
//! [`KeyGen::as_tenant_aware`] and get `None` from generators without it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::lock;
use crate::types::StorageKey;

const SOURCE: &str = "keygen";

/// Delimiter between the segments of a storage key
pub const KEY_GLUE: char = '/';

/// Group used when the caller supplies an empty one
pub const DEFAULT_GROUP: &str = "default";

/// Storage-key generation contract
///
/// `create` must be deterministic: identical inputs under identical
/// tenant state yield identical keys, and distinct groups never produce
/// overlapping keys even when raw keys collide.
pub trait KeyGen: Send + Sync {
    /// Build the storage key for `(key, group)`
    fn create(&self, key: &str, group: &str) -> StorageKey;

    /// Capability query for tenant-aware operations
    ///
    /// Returns `None` for generators without tenant scoping; callers use
    /// this instead of downcasting.
    fn as_tenant_aware(&self) -> Option<&dyn TenantAwareKeyGen> {
        None
    }
}

/// Extended contract for generators that scope keys per tenant
pub trait TenantAwareKeyGen: KeyGen {
    /// Replace the active tenant id, returns true once the switch is visible
    fn switch_tenant(&self, tenant_id: u64) -> bool;

    /// Register groups exempt from tenant scoping
    ///
    /// Merging is idempotent; the updated set is returned.
    fn add_global_groups(&self, groups: &[&str]) -> HashSet<String>;

    /// Currently active tenant id
    fn current_tenant(&self) -> u64;

    /// Snapshot of the groups exempt from tenant scoping
    fn global_groups(&self) -> HashSet<String>;
}

pub(crate) fn group_or_default(group: &str) -> &str {
    if group.is_empty() {
        DEFAULT_GROUP
    } else {
        group
    }
}

/// Single-tenant key generator producing `/group/key`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyGenerator;

impl KeyGen for DefaultKeyGenerator {
    fn create(&self, key: &str, group: &str) -> StorageKey {
        let group = group_or_default(group);
        format!("{KEY_GLUE}{group}{KEY_GLUE}{key}")
    }
}

/// Tenant-scoped key generator producing `/group/key/tenant_id`
///
/// Groups registered as tenant-global skip the trailing tenant segment,
/// so their entries are shared by every tenant.
pub struct TenantKeyGenerator {
    tenant_id: AtomicU64,
    global_groups: RwLock<HashSet<String>>,
}

impl TenantKeyGenerator {
    /// Create a generator scoped to `tenant_id` with no global groups
    pub fn new(tenant_id: u64) -> Self {
        Self {
            tenant_id: AtomicU64::new(tenant_id),
            global_groups: RwLock::new(HashSet::new()),
        }
    }

    /// Create a generator with an initial set of tenant-global groups
    pub fn with_global_groups<I>(tenant_id: u64, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            tenant_id: AtomicU64::new(tenant_id),
            global_groups: RwLock::new(groups.into_iter().map(Into::into).collect()),
        }
    }
}

impl KeyGen for TenantKeyGenerator {
    fn create(&self, key: &str, group: &str) -> StorageKey {
        let group = group_or_default(group);
        let globals = lock::rw_read(&self.global_groups, SOURCE, "create");
        if globals.contains(group) {
            format!("{KEY_GLUE}{group}{KEY_GLUE}{key}")
        } else {
            let tenant = self.tenant_id.load(Ordering::Acquire);
            format!("{KEY_GLUE}{group}{KEY_GLUE}{key}{KEY_GLUE}{tenant}")
        }
    }

    fn as_tenant_aware(&self) -> Option<&dyn TenantAwareKeyGen> {
        Some(self)
    }
}

impl TenantAwareKeyGen for TenantKeyGenerator {
    fn switch_tenant(&self, tenant_id: u64) -> bool {
        self.tenant_id.store(tenant_id, Ordering::Release);
        debug!(tenant_id, "Switched active tenant");
        true
    }

    fn add_global_groups(&self, groups: &[&str]) -> HashSet<String> {
        let mut set = lock::rw_write(&self.global_groups, SOURCE, "add_global_groups");
        for group in groups {
            set.insert((*group).to_string());
        }
        set.clone()
    }

    fn current_tenant(&self) -> u64 {
        self.tenant_id.load(Ordering::Acquire)
    }

    fn global_groups(&self) -> HashSet<String> {
        lock::rw_read(&self.global_groups, SOURCE, "global_groups").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_deterministic() {
        let keygen = DefaultKeyGenerator;
        assert_eq!(
            keygen.create("user_42", "sessions"),
            keygen.create("user_42", "sessions")
        );
        assert_eq!(keygen.create("user_42", "sessions"), "/sessions/user_42");
    }

    #[test]
    fn test_groups_never_collide() {
        let keygen = DefaultKeyGenerator;
        assert_ne!(keygen.create("k", "alpha"), keygen.create("k", "beta"));
    }

    #[test]
    fn test_empty_group_uses_default() {
        let keygen = DefaultKeyGenerator;
        assert_eq!(keygen.create("k", ""), "/default/k");
        assert_eq!(keygen.create("k", ""), keygen.create("k", "default"));
    }

    #[test]
    fn test_tenant_suffix_applied() {
        let keygen = TenantKeyGenerator::new(7);
        assert_eq!(keygen.create("user_42", "sessions"), "/sessions/user_42/7");
    }

    #[test]
    fn test_global_group_skips_tenant_suffix() {
        let keygen = TenantKeyGenerator::with_global_groups(7, ["site_options"]);
        assert_eq!(keygen.create("theme", "site_options"), "/site_options/theme");
        assert_eq!(keygen.create("theme", "posts"), "/posts/theme/7");
    }

    #[test]
    fn test_switch_tenant_changes_non_global_keys() {
        let keygen = TenantKeyGenerator::with_global_groups(1, ["site_options"]);
        let scoped_before = keygen.create("k", "posts");
        let global_before = keygen.create("k", "site_options");

        assert!(keygen.switch_tenant(2));

        assert_ne!(keygen.create("k", "posts"), scoped_before);
        assert_eq!(keygen.create("k", "site_options"), global_before);
        assert_eq!(keygen.current_tenant(), 2);
    }

    #[test]
    fn test_add_global_groups_is_idempotent() {
        let keygen = TenantKeyGenerator::new(1);

        let first = keygen.add_global_groups(&["a", "b"]);
        assert_eq!(first.len(), 2);

        let second = keygen.add_global_groups(&["b", "c"]);
        assert_eq!(second.len(), 3);
        assert!(second.contains("a"));
        assert!(second.contains("b"));
        assert!(second.contains("c"));
    }

    #[test]
    fn test_capability_query() {
        let plain = DefaultKeyGenerator;
        assert!(plain.as_tenant_aware().is_none());

        let tenant = TenantKeyGenerator::new(1);
        assert!(tenant.as_tenant_aware().is_some());
    }
}
