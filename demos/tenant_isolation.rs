//! Tenant Isolation Demo Application
//!
//! Demonstrates tenant-scoped cache keys, global groups shared across
//! tenants, and the suspended-additions switch.
//!
//! Usage:
//!   cargo run --example tenant_isolation

use serde_json::json;
use strata_cache::{CacheAdapter, CacheProxy, EphemeralBackend, TenantKeyGenerator};
use tracing::{info, Level};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("=== Tenant Isolation Demo ===");

    // Tenant-aware wiring: both tiers in process, keys scoped to tenant 1
    let proxy = CacheProxy::new(
        CacheAdapter::new(Box::new(EphemeralBackend::new()), false),
        CacheAdapter::new(Box::new(EphemeralBackend::new()), true),
        Box::new(TenantKeyGenerator::new(1)),
    );
    proxy.add_global_groups(&["site_options"]);

    info!("\n--- Tenant 1 Writes ---");
    proxy.set("user_42", json!({"cart": ["book", "pen"]}), "sessions", 0);
    proxy.set("theme", json!("dark"), "site_options", 0);
    info!(
        "session for tenant 1: {:?}",
        proxy.get("user_42", "sessions")
    );

    info!("\n--- Switch to Tenant 2 ---");
    proxy.switch_tenant(2);
    info!(
        "session visible to tenant 2: {:?}",
        proxy.get("user_42", "sessions")
    );
    info!(
        "global theme visible to tenant 2: {:?}",
        proxy.get("theme", "site_options")
    );

    proxy.set("user_42", json!({"cart": []}), "sessions", 0);
    info!("tenant 2 wrote its own session");

    info!("\n--- Back to Tenant 1 ---");
    proxy.switch_tenant(1);
    info!(
        "session for tenant 1 again: {:?}",
        proxy.get("user_42", "sessions")
    );

    info!("\n--- Suspended Additions ---");
    proxy.suspend_additions(true);
    info!(
        "add while suspended: {}",
        proxy.add("pending", json!(1), "sessions", 0)
    );
    proxy.suspend_additions(false);
    info!(
        "add after resume: {}",
        proxy.add("pending", json!(1), "sessions", 0)
    );

    info!("\n--- Statistics ---");
    info!("{}", proxy.stats());

    info!("\n=== Demo Complete ===");

    Ok(())
}
