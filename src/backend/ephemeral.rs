//! In-process storage backend
//!
//! Backs the non-persistent tier and serves as the fallback when no
//! durable backend is configured. Entries live in a locked map and die
//! with the process.
//!
//! Expired entries follow their [`InvalidationPolicy`]: strict entries
//! turn into plain misses, serve-stale entries keep answering reads
//! with the old value while exactly one reader holds the refresh claim
//! and recomputes.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::backend::item::{CacheItem, InvalidationPolicy};
use crate::backend::CacheBackend;
use crate::error::Result;
use crate::lock;
use crate::types::{CacheValue, StorageKey};

const SOURCE: &str = "backend.ephemeral";

/// How long a single reader may hold the refresh claim on a stale entry
/// before the next reader takes over
const STALE_REFRESH_WINDOW_SECS: i64 = 30;

struct StoredEntry {
    value: CacheValue,
    deadline: Option<DateTime<Utc>>,
    invalidation: InvalidationPolicy,
    stale_claimed_until: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.deadline, Some(deadline) if now > deadline)
    }

    fn claim_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.stale_claimed_until, Some(until) if now < until)
    }

    /// Seconds until the deadline, zero meaning no expiration; entries
    /// served stale report one second so a copy cannot outlive them
    fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        match self.deadline {
            None => 0,
            Some(deadline) => (deadline - now).num_seconds().max(1) as u64,
        }
    }
}

/// Outcome of one keyed read under the entries lock
enum Lookup {
    Miss,
    Served(CacheValue, InvalidationPolicy, u64),
    Evict,
}

fn read_entry(
    entries: &mut HashMap<StorageKey, StoredEntry>,
    key: &str,
    now: DateTime<Utc>,
) -> Lookup {
    match entries.get_mut(key) {
        None => Lookup::Miss,
        Some(entry) if !entry.is_expired(now) => Lookup::Served(
            entry.value.clone(),
            entry.invalidation,
            entry.remaining_secs(now),
        ),
        Some(entry) if entry.invalidation == InvalidationPolicy::ServeStale => {
            if entry.claim_active(now) {
                // Someone else is refreshing; keep serving the old value.
                Lookup::Served(entry.value.clone(), entry.invalidation, 1)
            } else {
                // This reader becomes the refresher.
                entry.stale_claimed_until = Some(now + Duration::seconds(STALE_REFRESH_WINDOW_SECS));
                Lookup::Miss
            }
        }
        Some(_) => Lookup::Evict,
    }
}

/// Volatile in-process backend
pub struct EphemeralBackend {
    entries: Mutex<HashMap<StorageKey, StoredEntry>>,
    deferred: Mutex<Vec<CacheItem>>,
}

impl EphemeralBackend {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            deferred: Mutex::new(Vec::new()),
        }
    }

    /// Number of stored entries, expired ones included until purged
    pub fn len(&self) -> usize {
        lock::mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(entries: &mut HashMap<StorageKey, StoredEntry>, item: CacheItem) -> bool {
        let deadline = item.deadline();
        let invalidation = item.invalidation();
        let key = item.key().to_string();
        match item.into_value() {
            Some(value) => {
                entries.insert(
                    key,
                    StoredEntry {
                        value,
                        deadline,
                        invalidation,
                        stale_claimed_until: None,
                    },
                );
                true
            }
            // A valueless item has nothing to persist.
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn expire_now(&self, key: &str) {
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "expire_now");
        if let Some(entry) = entries.get_mut(key) {
            entry.deadline = Some(Utc::now() - Duration::seconds(1));
        }
    }
}

impl Default for EphemeralBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for EphemeralBackend {
    fn name(&self) -> &str {
        "ephemeral"
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn has_item(&self, key: &str) -> Result<bool> {
        let now = Utc::now();
        let entries = lock::mutex_lock(&self.entries, SOURCE, "has_item");
        Ok(match entries.get(key) {
            None => false,
            Some(entry) if !entry.is_expired(now) => true,
            // An expired serve-stale entry still answers reads while the
            // refresh claim is active, so it counts as present.
            Some(entry) => {
                entry.invalidation == InvalidationPolicy::ServeStale && entry.claim_active(now)
            }
        })
    }

    fn item(&self, key: &str) -> Result<CacheItem> {
        let now = Utc::now();
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "item");
        match read_entry(&mut entries, key, now) {
            Lookup::Served(value, invalidation, remaining) => {
                let mut item = CacheItem::hit(key, value);
                item.set_invalidation(invalidation);
                item.expires_after(remaining);
                Ok(item)
            }
            Lookup::Miss => Ok(CacheItem::miss(key)),
            Lookup::Evict => {
                entries.remove(key);
                Ok(CacheItem::miss(key))
            }
        }
    }

    fn items(&self, keys: &[StorageKey]) -> Result<Vec<CacheItem>> {
        let now = Utc::now();
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "items");
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            match read_entry(&mut entries, key, now) {
                Lookup::Served(value, invalidation, remaining) => {
                    let mut item = CacheItem::hit(key.clone(), value);
                    item.set_invalidation(invalidation);
                    item.expires_after(remaining);
                    result.push(item);
                }
                Lookup::Miss => result.push(CacheItem::miss(key.clone())),
                Lookup::Evict => {
                    entries.remove(key);
                    result.push(CacheItem::miss(key.clone()));
                }
            }
        }
        Ok(result)
    }

    fn save(&self, item: CacheItem) -> Result<bool> {
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "save");
        Ok(Self::store(&mut entries, item))
    }

    fn save_deferred(&self, item: CacheItem) -> Result<bool> {
        let mut deferred = lock::mutex_lock(&self.deferred, SOURCE, "save_deferred");
        deferred.push(item);
        Ok(true)
    }

    fn commit(&self) -> Result<bool> {
        let queued: Vec<CacheItem> = {
            let mut deferred = lock::mutex_lock(&self.deferred, SOURCE, "commit");
            std::mem::take(&mut *deferred)
        };
        if queued.is_empty() {
            return Ok(true);
        }

        let count = queued.len();
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "commit");
        for item in queued {
            Self::store(&mut entries, item);
        }
        debug!(count, "Committed deferred writes");
        Ok(true)
    }

    fn delete_item(&self, key: &str) -> Result<bool> {
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "delete_item");
        entries.remove(key);
        // The goal is an absent key, so deleting a missing one succeeds.
        Ok(true)
    }

    fn clear(&self) -> Result<bool> {
        lock::mutex_lock(&self.entries, SOURCE, "clear").clear();
        lock::mutex_lock(&self.deferred, SOURCE, "clear").clear();
        debug!("Cleared ephemeral backend");
        Ok(true)
    }

    fn purge(&self) -> Result<bool> {
        let now = Utc::now();
        let mut entries = lock::mutex_lock(&self.entries, SOURCE, "purge");
        let before = entries.len();
        entries.retain(|_, entry| {
            !entry.is_expired(now)
                || (entry.invalidation == InvalidationPolicy::ServeStale && entry.claim_active(now))
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        Ok(true)
    }
}
