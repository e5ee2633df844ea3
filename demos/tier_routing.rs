//! Tier Routing Demo Application
//!
//! Demonstrates group-based tier routing, the verb surface, flush
//! semantics and hit/miss accounting of the two-tier cache proxy.
//!
//! Usage:
//!   cargo run --example tier_routing
//!
//! Environment variables:
//!   STRATA_CACHE_BACKEND        - persistent backend id (default: ephemeral)
//!   STRATA_CACHE_BACKEND_ARGS   - backend argument JSON, optionally base64
//!   STRATA_CACHE_MEMOIZE        - memoize persistent reads (default: true)
//!   STRATA_CACHE_PURGE_INTERVAL - purge interval in seconds (default: 3600)

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use strata_cache::{spawn_purge_loop, CacheProxy, ProxyConfig};
use tracing::{info, Level};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("=== Tier Routing Demo ===");

    let config = ProxyConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Backend: {} (memoize: {})",
        config.backend, config.use_memoization
    );

    let proxy = Arc::new(CacheProxy::from_config(&config));

    info!("\n--- Group Registration ---");
    let registered = proxy.add_non_persistent_groups(&["request_totals", "render_state"]);
    info!("Non-persistent groups: {:?}", registered);
    info!(
        "'request_totals' routes to: {}",
        proxy.choose_tier("request_totals")
    );
    info!("'users' routes to: {}", proxy.choose_tier("users"));

    info!("\n--- Writes Across Tiers ---");
    proxy.set(
        "user_42",
        json!({"name": "Ada", "role": "admin"}),
        "users",
        3600,
    );
    proxy.set("seen", json!(17), "request_totals", 0);
    info!("Stored one entry per tier");

    info!("\n--- Verb Semantics ---");
    info!(
        "add over an existing key: {}",
        proxy.add("user_42", json!("clobber"), "users", 0)
    );
    info!(
        "replace of an existing key: {}",
        proxy.replace(
            "user_42",
            json!({"name": "Ada", "role": "owner"}),
            "users",
            3600,
        )
    );
    info!("incr on a counter: {:?}", proxy.incr("seen", 3, "request_totals"));

    info!("\n--- Batch Round Trip ---");
    let entries = vec![("a", json!(1)), ("b", json!(2)), ("c", json!(3))];
    let saved = proxy.set_multiple(&entries, "letters", 0);
    info!("set_multiple results: {:?}", saved);

    let fetched = proxy.get_multiple(&["a", "b", "missing"], "letters");
    for (key, value) in &fetched {
        match value {
            Some(v) => info!("  ✓ {} => {}", key, v),
            None => info!("  ✗ {} => miss", key),
        }
    }

    info!("\n--- Runtime Flush ---");
    proxy.flush_runtime();
    info!("After flush_runtime:");
    info!(
        "  'seen' (non-persistent): {:?}",
        proxy.get("seen", "request_totals")
    );
    info!("  'user_42' (persistent): {:?}", proxy.get("user_42", "users"));

    info!("\n--- Background Purge ---");
    let purge = spawn_purge_loop(Arc::clone(&proxy), Duration::from_secs(2));
    std::thread::sleep(Duration::from_millis(100));
    purge.stop();
    info!("Purge loop started and shut down cleanly");

    info!("\n--- Statistics ---");
    let stats = proxy.stats();
    info!("{}", stats);
    info!("Hit rate: {:.2}", stats.hit_rate());

    info!("\n=== Demo Complete ===");

    Ok(())
}
