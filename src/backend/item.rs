//! The item a backend hands out and accepts back
//!
//! A [`CacheItem`] is either a hit (carries a value) or a miss, plus the
//! write-side hints a backend needs: relative expiration and the
//! invalidation policy applied once the entry goes stale.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CacheValue, StorageKey};

/// What a backend does with an entry that has expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvalidationPolicy {
    /// Expired entries are plain misses
    #[default]
    Strict,

    /// Keep serving the expired value while a single caller observes the
    /// miss and refreshes it, so concurrent readers never stampede the
    /// origin or block on the refresh
    ServeStale,
}

/// Unit of exchange with a [`CacheBackend`](crate::backend::CacheBackend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheItem {
    key: StorageKey,
    value: Option<CacheValue>,
    expire_seconds: u64,
    invalidation: InvalidationPolicy,
}

impl CacheItem {
    /// A miss for `key`, ready to be filled in and saved
    pub fn miss(key: impl Into<StorageKey>) -> Self {
        Self {
            key: key.into(),
            value: None,
            expire_seconds: 0,
            invalidation: InvalidationPolicy::default(),
        }
    }

    /// A hit for `key` carrying `value`
    pub fn hit(key: impl Into<StorageKey>, value: CacheValue) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            expire_seconds: 0,
            invalidation: InvalidationPolicy::default(),
        }
    }

    /// The storage key this item belongs to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when the backend found no live value for the key
    pub fn is_miss(&self) -> bool {
        self.value.is_none()
    }

    /// The carried value, if any
    pub fn value(&self) -> Option<&CacheValue> {
        self.value.as_ref()
    }

    /// Consume the item, yielding the carried value
    pub fn into_value(self) -> Option<CacheValue> {
        self.value
    }

    /// Replace the carried value; the item stops being a miss
    pub fn set(&mut self, value: CacheValue) {
        self.value = Some(value);
    }

    /// Expire this entry `seconds` from the moment it is saved
    ///
    /// Zero means the entry never expires.
    pub fn expires_after(&mut self, seconds: u64) {
        self.expire_seconds = seconds;
    }

    /// Relative expiration in seconds, zero meaning none
    pub fn expire_seconds(&self) -> u64 {
        self.expire_seconds
    }

    /// Choose what happens once the entry goes stale
    pub fn set_invalidation(&mut self, policy: InvalidationPolicy) {
        self.invalidation = policy;
    }

    /// The invalidation policy attached to this item
    pub fn invalidation(&self) -> InvalidationPolicy {
        self.invalidation
    }

    /// Resolve the relative expiration against the current clock
    ///
    /// Backends call this at save time; `None` means no deadline. An
    /// expiration too large to land on the calendar also resolves to
    /// `None`; such entries never expire.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        if self.expire_seconds == 0 {
            return None;
        }
        let ttl = Duration::from_std(std::time::Duration::from_secs(self.expire_seconds)).ok()?;
        Utc::now().checked_add_signed(ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_miss_and_hit() {
        let miss = CacheItem::miss("/default/k");
        assert!(miss.is_miss());
        assert!(miss.value().is_none());
        assert_eq!(miss.key(), "/default/k");

        let hit = CacheItem::hit("/default/k", json!(42));
        assert!(!hit.is_miss());
        assert_eq!(hit.value(), Some(&json!(42)));
    }

    #[test]
    fn test_set_turns_miss_into_hit() {
        let mut item = CacheItem::miss("/default/k");
        item.set(json!("value"));
        assert!(!item.is_miss());
        assert_eq!(item.into_value(), Some(json!("value")));
    }

    #[test]
    fn test_zero_expiration_means_no_deadline() {
        let mut item = CacheItem::hit("/default/k", json!(1));
        item.expires_after(0);
        assert!(item.deadline().is_none());
    }

    #[test]
    fn test_oversized_expiration_means_no_deadline() {
        let mut item = CacheItem::hit("/default/k", json!(1));

        // More seconds than a duration can hold.
        item.expires_after(u64::MAX);
        assert!(item.deadline().is_none());

        // Holdable as a duration, but past the end of the calendar.
        item.expires_after(9_000_000_000_000_000);
        assert!(item.deadline().is_none());
    }

    #[test]
    fn test_deadline_resolves_in_future() {
        let mut item = CacheItem::hit("/default/k", json!(1));
        item.expires_after(60);

        let deadline = item.deadline().unwrap();
        assert!(deadline > Utc::now());
        assert!(deadline <= Utc::now() + Duration::seconds(61));
    }

    #[test]
    fn test_invalidation_defaults_to_strict() {
        let mut item = CacheItem::hit("/default/k", json!(1));
        assert_eq!(item.invalidation(), InvalidationPolicy::Strict);

        item.set_invalidation(InvalidationPolicy::ServeStale);
        assert_eq!(item.invalidation(), InvalidationPolicy::ServeStale);
    }
}
