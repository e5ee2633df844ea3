//! # Strata Cache (strata-cache)
//!
//! A tiered object-cache façade: logical `(key, group)` pairs in,
//! backend-qualified storage keys and tier routing underneath.
//!
//! ## Features
//!
//! - Two-tier routing: groups registered non-persistent stay in-process,
//!   everything else goes to the configured durable backend
//! - Namespaced storage keys with optional multi-tenant isolation
//! - Full object-cache verb surface including batch variants, flush,
//!   flush_runtime and flush_group
//! - Deferred batch writes with a single commit, finished off by `Drop`
//!   if a batch is still pending at teardown
//! - Per-tier memoization and hit/miss accounting
//! - Serve-stale expiration so readers racing a refresh get the old
//!   value instead of a miss stampede
//! - Environment-driven configuration with graceful fallbacks
//!
//! ## Quick Start
//!
//! ```no_run
//! use strata_cache::{CacheProxy, ProxyConfig};
//! use serde_json::json;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ProxyConfig::from_env();
//!     config.validate().map_err(anyhow::Error::msg)?;
//!
//!     let proxy = CacheProxy::from_config(&config);
//!
//!     proxy.set("user_42", json!({"name": "Ada"}), "users", 3600);
//!     if let Some(user) = proxy.get("user_42", "users") {
//!         println!("cached: {user}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Tier Routing
//!
//! Entries in non-persistent groups never reach durable storage and die
//! with `flush_runtime`; everything else survives until `flush`.
//!
//! ```no_run
//! use strata_cache::{CacheProxy, ProxyConfig};
//! use serde_json::json;
//!
//! let proxy = CacheProxy::from_config(&ProxyConfig::ephemeral());
//! proxy.add_non_persistent_groups(&["request_totals"]);
//!
//! proxy.set("seen", json!(3), "request_totals", 0);
//! proxy.flush_runtime();
//! assert_eq!(proxy.get("seen", "request_totals"), None);
//! ```
//!
//! ## Tenant Isolation
//!
//! With a tenant-aware key generator, tenants sharing one backend never
//! see each other's entries, except in groups registered as global.
//!
//! ```no_run
//! use strata_cache::{CacheAdapter, CacheProxy, EphemeralBackend, TenantKeyGenerator};
//! use serde_json::json;
//!
//! let proxy = CacheProxy::new(
//!     CacheAdapter::new(Box::new(EphemeralBackend::new()), false),
//!     CacheAdapter::new(Box::new(EphemeralBackend::new()), true),
//!     Box::new(TenantKeyGenerator::new(1)),
//! );
//! proxy.add_global_groups(&["site_options"]);
//!
//! proxy.set("user_42", json!("session"), "sessions", 0);
//! proxy.switch_tenant(2);
//! assert_eq!(proxy.get("user_42", "sessions"), None);
//! ```
//!
//! ## Background Maintenance
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_cache::{spawn_purge_loop, CacheProxy, ProxyConfig};
//!
//! let config = ProxyConfig::from_env();
//! let proxy = Arc::new(CacheProxy::from_config(&config));
//!
//! let purge = spawn_purge_loop(Arc::clone(&proxy), config.purge_interval);
//! // ... serve traffic ...
//! purge.stop();
//! ```

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod keygen;
mod lock;
pub mod maintenance;
pub mod proxy;
pub mod types;

// Re-export main types for convenience
pub use adapter::CacheAdapter;
pub use backend::{
    BackendFactory, BackendRegistry, CacheBackend, CacheItem, CompositeBackend, EphemeralBackend,
    InvalidationPolicy, EPHEMERAL_BACKEND,
};
pub use config::{ProxyConfig, ProxyConfigBuilder};
pub use error::{CacheError, Result};
pub use keygen::{
    DefaultKeyGenerator, KeyGen, TenantAwareKeyGen, TenantKeyGenerator, DEFAULT_GROUP, KEY_GLUE,
};
pub use maintenance::{spawn_purge_loop, PurgeLoopHandle};
pub use proxy::CacheProxy;
pub use types::{CacheStats, CacheValue, StorageKey, Tier, TierStats};
