//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend-qualified cache key, derived from a `(key, group)` pair
pub type StorageKey = String;

/// Cache value type - arbitrary JSON payloads
pub type CacheValue = serde_json::Value;

/// The two storage tiers an operation can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// In-process only, cleared at the end of the request/process
    NonPersistent,

    /// Backed by durable storage (as durable as the backend makes it)
    Persistent,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::NonPersistent => write!(f, "non_persistent"),
            Tier::Persistent => write!(f, "persistent"),
        }
    }
}

/// Hit/miss counters for a single adapter (one tier)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TierStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,
}

impl TierStats {
    /// Calculate hit rate for this tier as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Aggregate statistics snapshot across both tiers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total cache hits, summed over both tiers
    pub hits: u64,

    /// Total cache misses, summed over both tiers
    pub misses: u64,

    /// Breakdown for the non-persistent tier
    pub non_persistent: TierStats,

    /// Breakdown for the persistent tier
    pub persistent: TierStats,

    /// Groups currently routed to the non-persistent tier
    pub non_persistent_groups: Vec<String>,

    /// Groups currently exempt from tenant scoping
    pub global_groups: Vec<String>,
}

impl CacheStats {
    /// Calculate aggregate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate aggregate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, persistent: {}/{}, non_persistent: {}/{} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.persistent.hits,
            self.persistent.misses,
            self.non_persistent.hits,
            self.non_persistent.misses,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_stats_hit_rate() {
        let stats = TierStats {
            hits: 80,
            misses: 20,
        };
        assert_eq!(stats.hit_rate(), 80.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 100.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            persistent: TierStats {
                hits: 60,
                misses: 40,
            },
            non_persistent: TierStats {
                hits: 40,
                misses: 10,
            },
            ..Default::default()
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(format!("{}", Tier::NonPersistent), "non_persistent");
        assert_eq!(format!("{}", Tier::Persistent), "persistent");
    }
}
