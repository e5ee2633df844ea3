//! Adapter between the verb surface and one storage backend
//!
//! A [`CacheAdapter`] owns exactly one backend and therefore one tier's
//! behavior. On top of the raw item API it layers:
//!
//! - an optional in-process memo map, read through on `get` and kept in
//!   step by every write and delete
//! - hit/miss counters, readable as a [`TierStats`] snapshot
//! - batch verbs that queue deferred writes and commit once
//! - the error boundary: malformed keys and backend failures come out
//!   as `false` / `None`, indistinguishable from misses, never panics
//!
//! Dropping the adapter commits any still-deferred writes, so batched
//! values cannot be lost by an early return.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::backend::{CacheBackend, CacheItem, InvalidationPolicy};
use crate::error::{CacheError, Result};
use crate::lock;
use crate::types::{CacheValue, StorageKey, TierStats};

const SOURCE: &str = "adapter";

/// Longest storage key a backend is asked to accept
const MAX_KEY_BYTES: usize = 1024;

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey {
            key: key.to_string(),
            reason: "empty".to_string(),
        });
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(CacheError::InvalidKey {
            key: key.chars().take(32).collect(),
            reason: format!("longer than {MAX_KEY_BYTES} bytes"),
        });
    }
    if key.contains('\0') {
        return Err(CacheError::InvalidKey {
            key: key.replace('\0', "\\0"),
            reason: "embedded NUL".to_string(),
        });
    }
    Ok(())
}

fn build_item(key: &str, value: &CacheValue, expire_secs: u64) -> CacheItem {
    let mut item = CacheItem::hit(key, value.clone());
    if expire_secs > 0 {
        item.expires_after(expire_secs);
    }
    // Writes always opt into stale serving so readers racing a refresh
    // get the previous value instead of an error.
    item.set_invalidation(InvalidationPolicy::ServeStale);
    item
}

/// One backend plus memoization, counters and batching
pub struct CacheAdapter {
    backend: Box<dyn CacheBackend>,
    memoize: bool,
    memo: Mutex<HashMap<StorageKey, CacheValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheAdapter {
    /// Wrap `backend`; `memoize` enables the in-process memo map
    pub fn new(backend: Box<dyn CacheBackend>, memoize: bool) -> Self {
        Self {
            backend,
            memoize,
            memo: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Name of the wrapped backend, for log output
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Whether the wrapped backend reports itself durable
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    /// Write `value` only when `key` is currently absent
    pub fn add(&self, key: &str, value: CacheValue, expire_secs: u64) -> bool {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected cache add");
            return false;
        }
        match self.backend.has_item(key) {
            Ok(true) => false,
            Ok(false) => self.set(key, value, expire_secs),
            Err(e) => {
                warn!(key, error = %e, "Cache backend presence check failed");
                false
            }
        }
    }

    /// Write `value` unconditionally
    pub fn set(&self, key: &str, value: CacheValue, expire_secs: u64) -> bool {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected cache set");
            return false;
        }
        let item = build_item(key, &value, expire_secs);
        if self.save_now(item) {
            self.memo_insert(key, value);
            true
        } else {
            // A failed write leaves the backend state unknown; the memo
            // must not keep answering for it.
            self.memo_remove(key);
            false
        }
    }

    /// Read `key`, memo first, backend second
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected cache get");
            return None;
        }
        if let Some(value) = self.memo_get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }
        match self.backend.item(key) {
            Ok(item) if item.is_miss() => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Ok(item) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let value = item.into_value()?;
                self.memo_insert(key, value.clone());
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Cache backend read failed");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Write `value` only when `key` is currently present
    pub fn replace(&self, key: &str, value: CacheValue, expire_secs: u64) -> bool {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected cache replace");
            return false;
        }
        match self.backend.has_item(key) {
            Ok(true) => self.set(key, value, expire_secs),
            Ok(false) => false,
            Err(e) => {
                warn!(key, error = %e, "Cache backend presence check failed");
                false
            }
        }
    }

    /// Add `offset` to the integer stored at `key`
    ///
    /// Returns the new value, or `None` when the key is absent, holds a
    /// non-integer, or the arithmetic would overflow. Nothing is written
    /// in the failure cases. The read half counts toward the hit/miss
    /// counters like any other lookup.
    pub fn incr(&self, key: &str, offset: i64) -> Option<i64> {
        self.offset_value(key, offset)
    }

    /// Subtract `offset` from the integer stored at `key`
    pub fn decr(&self, key: &str, offset: i64) -> Option<i64> {
        self.offset_value(key, offset.checked_neg()?)
    }

    fn offset_value(&self, key: &str, delta: i64) -> Option<i64> {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected cache incr/decr");
            return None;
        }
        let item = match self.backend.item(key) {
            Ok(item) => item,
            Err(e) => {
                warn!(key, error = %e, "Cache backend read failed");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if item.is_miss() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        let current = item.value().and_then(CacheValue::as_i64)?;
        let next = current.checked_add(delta)?;
        // Rewrite with whatever lifetime the entry had left.
        let remaining = item.expire_seconds();
        let value = CacheValue::from(next);
        if self.save_now(build_item(key, &value, remaining)) {
            self.memo_insert(key, value);
            Some(next)
        } else {
            self.memo_remove(key);
            None
        }
    }

    /// Remove `key` from memo and backend
    pub fn delete(&self, key: &str) -> bool {
        if let Err(e) = validate_key(key) {
            debug!(error = %e, "Rejected cache delete");
            return false;
        }
        self.memo_remove(key);
        match self.backend.delete_item(key) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(key, error = %e, "Cache backend delete failed");
                false
            }
        }
    }

    /// Drop every entry in memo and backend
    pub fn clear(&self) -> bool {
        self.memo_clear();
        match self.backend.clear() {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Cache backend clear failed");
                false
            }
        }
    }

    /// Run the backend's maintenance pass
    pub fn purge(&self) -> bool {
        match self.backend.purge() {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Cache backend purge failed");
                false
            }
        }
    }

    /// Clear only the non-persistent layers of a composite backend
    ///
    /// A no-op returning true when the backend has no sub-backends. When
    /// layers do get cleared the memo goes with them, otherwise it would
    /// keep answering for entries that no longer exist.
    pub fn clear_non_persistent(&self) -> bool {
        let subs = self.backend.sub_backends();
        if subs.is_empty() {
            return true;
        }
        self.memo_clear();
        let mut all = true;
        for sub in subs.iter().filter(|sub| !sub.is_persistent()) {
            match sub.clear() {
                Ok(ok) => all &= ok,
                Err(e) => {
                    warn!(layer = sub.name(), error = %e, "Cache layer clear failed");
                    all = false;
                }
            }
        }
        all
    }

    /// Batch `add`: queue each absent key, commit once
    ///
    /// Results align with `entries` by index.
    pub fn add_multiple(&self, entries: &[(StorageKey, CacheValue)], expire_secs: u64) -> Vec<bool> {
        let mut results = Vec::with_capacity(entries.len());
        let mut queued_any = false;
        for (key, value) in entries {
            if validate_key(key).is_err() {
                results.push(false);
                continue;
            }
            let ok = match self.backend.has_item(key) {
                Ok(true) => false,
                Ok(false) => self.save_later(build_item(key, value, expire_secs)),
                Err(e) => {
                    warn!(key = key.as_str(), error = %e, "Cache backend presence check failed");
                    false
                }
            };
            queued_any |= ok;
            results.push(ok);
        }
        self.finish_batch(entries, results, queued_any)
    }

    /// Batch `set`: queue every key, commit once
    ///
    /// Results align with `entries` by index.
    pub fn set_multiple(&self, entries: &[(StorageKey, CacheValue)], expire_secs: u64) -> Vec<bool> {
        let mut results = Vec::with_capacity(entries.len());
        let mut queued_any = false;
        for (key, value) in entries {
            if validate_key(key).is_err() {
                results.push(false);
                continue;
            }
            let ok = self.save_later(build_item(key, value, expire_secs));
            queued_any |= ok;
            results.push(ok);
        }
        self.finish_batch(entries, results, queued_any)
    }

    /// Batch `get`; results align with `keys` by index
    pub fn get_multiple(&self, keys: &[StorageKey]) -> Vec<Option<CacheValue>> {
        let mut results: Vec<Option<CacheValue>> = vec![None; keys.len()];
        let mut fetch: Vec<(usize, StorageKey)> = Vec::new();

        for (index, key) in keys.iter().enumerate() {
            if validate_key(key).is_err() {
                continue;
            }
            match self.memo_get(key) {
                Some(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    results[index] = Some(value);
                }
                None => fetch.push((index, key.clone())),
            }
        }
        if fetch.is_empty() {
            return results;
        }

        let fetch_keys: Vec<StorageKey> = fetch.iter().map(|(_, key)| key.clone()).collect();
        match self.backend.items(&fetch_keys) {
            Ok(items) => {
                for ((index, key), item) in fetch.into_iter().zip(items) {
                    if item.is_miss() {
                        self.misses.fetch_add(1, Ordering::Relaxed);
                    } else {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        if let Some(value) = item.into_value() {
                            self.memo_insert(&key, value.clone());
                            results[index] = Some(value);
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Cache backend batch read failed");
                self.misses.fetch_add(fetch.len() as u64, Ordering::Relaxed);
            }
        }
        results
    }

    /// Batch `delete`; results align with `keys` by index
    pub fn delete_multiple(&self, keys: &[StorageKey]) -> Vec<bool> {
        keys.iter().map(|key| self.delete(key)).collect()
    }

    /// Counter snapshot for this tier
    pub fn stats(&self) -> TierStats {
        TierStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn save_now(&self, item: CacheItem) -> bool {
        match self.backend.save(item) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Cache backend write failed");
                false
            }
        }
    }

    fn save_later(&self, item: CacheItem) -> bool {
        match self.backend.save_deferred(item) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Cache backend deferred write failed");
                false
            }
        }
    }

    /// Commit a batch and reconcile per-key results with the outcome
    fn finish_batch(
        &self,
        entries: &[(StorageKey, CacheValue)],
        results: Vec<bool>,
        queued_any: bool,
    ) -> Vec<bool> {
        let committed = if queued_any {
            match self.backend.commit() {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(error = %e, "Cache backend commit failed");
                    false
                }
            }
        } else {
            true
        };
        if committed {
            for ((key, value), ok) in entries.iter().zip(&results) {
                if *ok {
                    self.memo_insert(key, value.clone());
                }
            }
            results
        } else {
            // Queued keys never reached the backend.
            vec![false; results.len()]
        }
    }

    fn memo_get(&self, key: &str) -> Option<CacheValue> {
        if !self.memoize {
            return None;
        }
        lock::mutex_lock(&self.memo, SOURCE, "memo_get").get(key).cloned()
    }

    fn memo_insert(&self, key: &str, value: CacheValue) {
        if self.memoize {
            lock::mutex_lock(&self.memo, SOURCE, "memo_insert").insert(key.to_string(), value);
        }
    }

    fn memo_remove(&self, key: &str) {
        if self.memoize {
            lock::mutex_lock(&self.memo, SOURCE, "memo_remove").remove(key);
        }
    }

    fn memo_clear(&self) {
        if self.memoize {
            lock::mutex_lock(&self.memo, SOURCE, "memo_clear").clear();
        }
    }
}

impl Drop for CacheAdapter {
    /// Deferred writes must not die with the adapter
    fn drop(&mut self) {
        match self.backend.commit() {
            Ok(true) => {}
            Ok(false) => warn!("Backend reported incomplete commit during adapter drop"),
            Err(e) => warn!(error = %e, "Failed to commit deferred writes during adapter drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CompositeBackend, EphemeralBackend};
    use serde_json::json;

    fn adapter(memoize: bool) -> CacheAdapter {
        CacheAdapter::new(Box::new(EphemeralBackend::new()), memoize)
    }

    /// Backend that fails every call, for the error boundary tests
    struct FailingBackend;

    impl CacheBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }
        fn is_persistent(&self) -> bool {
            true
        }
        fn has_item(&self, _key: &str) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
        fn item(&self, _key: &str) -> Result<CacheItem> {
            Err(CacheError::BackendError("down".into()))
        }
        fn items(&self, _keys: &[StorageKey]) -> Result<Vec<CacheItem>> {
            Err(CacheError::BackendError("down".into()))
        }
        fn save(&self, _item: CacheItem) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
        fn save_deferred(&self, _item: CacheItem) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
        fn commit(&self) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
        fn delete_item(&self, _key: &str) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
        fn clear(&self) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
        fn purge(&self) -> Result<bool> {
            Err(CacheError::BackendError("down".into()))
        }
    }

    /// Ephemeral storage posing as durable, for composite tests
    struct DurableStub(EphemeralBackend);

    impl CacheBackend for DurableStub {
        fn name(&self) -> &str {
            "durable_stub"
        }
        fn is_persistent(&self) -> bool {
            true
        }
        fn has_item(&self, key: &str) -> Result<bool> {
            self.0.has_item(key)
        }
        fn item(&self, key: &str) -> Result<CacheItem> {
            self.0.item(key)
        }
        fn items(&self, keys: &[StorageKey]) -> Result<Vec<CacheItem>> {
            self.0.items(keys)
        }
        fn save(&self, item: CacheItem) -> Result<bool> {
            self.0.save(item)
        }
        fn save_deferred(&self, item: CacheItem) -> Result<bool> {
            self.0.save_deferred(item)
        }
        fn commit(&self) -> Result<bool> {
            self.0.commit()
        }
        fn delete_item(&self, key: &str) -> Result<bool> {
            self.0.delete_item(key)
        }
        fn clear(&self) -> Result<bool> {
            self.0.clear()
        }
        fn purge(&self) -> Result<bool> {
            self.0.purge()
        }
    }

    #[test]
    fn test_read_your_write_with_and_without_memo() {
        for memoize in [false, true] {
            let adapter = adapter(memoize);
            assert!(adapter.set("/g/k", json!("value"), 0));
            assert_eq!(adapter.get("/g/k"), Some(json!("value")));
        }
    }

    #[test]
    fn test_add_fails_on_existing_key() {
        let adapter = adapter(true);
        assert!(adapter.add("/g/k", json!("first"), 0));
        assert!(!adapter.add("/g/k", json!("second"), 0));
        assert_eq!(adapter.get("/g/k"), Some(json!("first")));
    }

    #[test]
    fn test_replace_fails_on_absent_key() {
        let adapter = adapter(true);
        assert!(!adapter.replace("/g/k", json!("value"), 0));
        assert_eq!(adapter.get("/g/k"), None);

        assert!(adapter.set("/g/k", json!("old"), 0));
        assert!(adapter.replace("/g/k", json!("new"), 0));
        assert_eq!(adapter.get("/g/k"), Some(json!("new")));
    }

    #[test]
    fn test_delete_wins_over_populated_memo() {
        let adapter = adapter(true);
        adapter.set("/g/k", json!("value"), 0);
        // Warm the memo through a read.
        assert_eq!(adapter.get("/g/k"), Some(json!("value")));

        assert!(adapter.delete("/g/k"));
        assert_eq!(adapter.get("/g/k"), None);
    }

    #[test]
    fn test_incr_and_decr() {
        let adapter = adapter(true);
        adapter.set("/g/count", json!(10), 0);

        assert_eq!(adapter.incr("/g/count", 5), Some(15));
        assert_eq!(adapter.get("/g/count"), Some(json!(15)));

        assert_eq!(adapter.decr("/g/count", 3), Some(12));
        assert_eq!(adapter.get("/g/count"), Some(json!(12)));
    }

    #[test]
    fn test_incr_on_absent_or_non_numeric_writes_nothing() {
        let adapter = adapter(true);
        assert_eq!(adapter.incr("/g/absent", 1), None);
        assert_eq!(adapter.get("/g/absent"), None);

        adapter.set("/g/text", json!("ten"), 0);
        assert_eq!(adapter.incr("/g/text", 1), None);
        assert_eq!(adapter.get("/g/text"), Some(json!("ten")));
    }

    #[test]
    fn test_incr_overflow_writes_nothing() {
        let adapter = adapter(true);
        adapter.set("/g/count", json!(i64::MAX), 0);
        assert_eq!(adapter.incr("/g/count", 1), None);
        assert_eq!(adapter.get("/g/count"), Some(json!(i64::MAX)));
    }

    #[test]
    fn test_counters_track_hits_and_misses() {
        let adapter = adapter(false);
        adapter.set("/g/k", json!(1), 0);

        adapter.get("/g/k");
        adapter.get("/g/k");
        adapter.get("/g/absent");

        let stats = adapter.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_memo_hit_counts_as_hit() {
        let adapter = adapter(true);
        adapter.set("/g/k", json!(1), 0);

        adapter.get("/g/k");
        adapter.get("/g/k");

        assert_eq!(adapter.hits(), 2);
        assert_eq!(adapter.misses(), 0);
    }

    #[test]
    fn test_incr_decr_reads_count_toward_counters() {
        let adapter = adapter(false);
        adapter.set("/g/count", json!(10), 0);
        adapter.set("/g/text", json!("ten"), 0);

        adapter.incr("/g/count", 5);
        adapter.decr("/g/count", 3);
        adapter.incr("/g/absent", 1);
        // A present non-integer is still a found entry.
        adapter.incr("/g/text", 1);

        assert_eq!(adapter.hits(), 3);
        assert_eq!(adapter.misses(), 1);
    }

    #[test]
    fn test_malformed_keys_never_raise() {
        let adapter = adapter(true);
        let huge = "k".repeat(2000);

        assert!(!adapter.set("", json!(1), 0));
        assert!(!adapter.set(&huge, json!(1), 0));
        assert!(!adapter.set("bad\0key", json!(1), 0));
        assert_eq!(adapter.get("bad\0key"), None);
        assert!(!adapter.delete("bad\0key"));
        assert_eq!(adapter.incr(&huge, 1), None);
    }

    #[test]
    fn test_backend_failures_become_negative_results() {
        let adapter = CacheAdapter::new(Box::new(FailingBackend), true);

        assert!(!adapter.set("/g/k", json!(1), 0));
        assert_eq!(adapter.get("/g/k"), None);
        assert!(!adapter.add("/g/k", json!(1), 0));
        assert!(!adapter.replace("/g/k", json!(1), 0));
        assert!(!adapter.delete("/g/k"));
        assert!(!adapter.clear());
        assert!(!adapter.purge());
        assert_eq!(adapter.incr("/g/k", 1), None);

        let results = adapter.set_multiple(&[("/g/a".to_string(), json!(1))], 0);
        assert_eq!(results, vec![false]);
    }

    #[test]
    fn test_set_multiple_then_get_multiple_align_by_index() {
        let adapter = adapter(true);
        let entries = vec![
            ("/g/a".to_string(), json!("a")),
            ("/g/b".to_string(), json!("b")),
        ];

        assert_eq!(adapter.set_multiple(&entries, 0), vec![true, true]);

        let keys = vec!["/g/a".to_string(), "/g/missing".to_string(), "/g/b".to_string()];
        let values = adapter.get_multiple(&keys);
        assert_eq!(values[0], Some(json!("a")));
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(json!("b")));
    }

    #[test]
    fn test_add_multiple_skips_existing_keys() {
        let adapter = adapter(true);
        adapter.set("/g/a", json!("old"), 0);

        let entries = vec![
            ("/g/a".to_string(), json!("new")),
            ("/g/b".to_string(), json!("b")),
        ];
        assert_eq!(adapter.add_multiple(&entries, 0), vec![false, true]);
        assert_eq!(adapter.get("/g/a"), Some(json!("old")));
        assert_eq!(adapter.get("/g/b"), Some(json!("b")));
    }

    #[test]
    fn test_batch_with_invalid_key_fails_only_that_key() {
        let adapter = adapter(true);
        let entries = vec![
            ("/g/good".to_string(), json!(1)),
            ("bad\0key".to_string(), json!(2)),
        ];

        assert_eq!(adapter.set_multiple(&entries, 0), vec![true, false]);
        assert_eq!(adapter.get("/g/good"), Some(json!(1)));
    }

    #[test]
    fn test_delete_multiple() {
        let adapter = adapter(true);
        adapter.set("/g/a", json!(1), 0);
        adapter.set("/g/b", json!(2), 0);

        let keys = vec!["/g/a".to_string(), "/g/b".to_string()];
        assert_eq!(adapter.delete_multiple(&keys), vec![true, true]);
        assert_eq!(adapter.get_multiple(&keys), vec![None, None]);
    }

    #[test]
    fn test_clear_also_empties_memo() {
        let adapter = adapter(true);
        adapter.set("/g/k", json!(1), 0);
        adapter.get("/g/k");

        assert!(adapter.clear());
        assert_eq!(adapter.get("/g/k"), None);
    }

    #[test]
    fn test_clear_non_persistent_without_composite_is_a_noop() {
        let adapter = adapter(true);
        adapter.set("/g/k", json!(1), 0);

        assert!(adapter.clear_non_persistent());
        assert_eq!(adapter.get("/g/k"), Some(json!(1)));
    }

    #[test]
    fn test_clear_non_persistent_keeps_durable_layer() {
        let composite = CompositeBackend::staggered(
            Box::new(EphemeralBackend::new()),
            Box::new(DurableStub(EphemeralBackend::new())),
        );
        let adapter = CacheAdapter::new(Box::new(composite), true);
        adapter.set("/g/k", json!("kept"), 0);

        assert!(adapter.clear_non_persistent());
        // The durable layer still has it; the read promotes it back.
        assert_eq!(adapter.get("/g/k"), Some(json!("kept")));
    }

    #[test]
    fn test_clear_non_persistent_drops_volatile_layers() {
        let composite = CompositeBackend::staggered(
            Box::new(EphemeralBackend::new()),
            Box::new(EphemeralBackend::new()),
        );
        let adapter = CacheAdapter::new(Box::new(composite), true);
        adapter.set("/g/k", json!("gone"), 0);

        assert!(adapter.clear_non_persistent());
        assert_eq!(adapter.get("/g/k"), None);
    }

    #[test]
    fn test_is_persistent_reflects_the_backend() {
        assert!(!adapter(false).is_persistent());

        let durable = CacheAdapter::new(Box::new(DurableStub(EphemeralBackend::new())), false);
        assert!(durable.is_persistent());
    }
}
