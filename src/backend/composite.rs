//! Layered backend composed of ordered sub-backends
//!
//! Reads walk the layers front to back and promote a hit into every
//! layer in front of it, so a value found in durable storage answers
//! the next read from the in-process layer. Writes, deletes, clears and
//! commits fan out to every layer.
//!
//! The composite is what makes `flush_runtime` meaningful on the
//! persistent tier: the adapter asks for [`sub_backends`] and clears
//! only the layers that report themselves non-persistent.
//!
//! [`sub_backends`]: crate::backend::CacheBackend::sub_backends

use tracing::debug;

use crate::backend::{CacheBackend, CacheItem};
use crate::error::Result;
use crate::types::StorageKey;

/// Ordered stack of backends acting as one
pub struct CompositeBackend {
    subs: Vec<Box<dyn CacheBackend>>,
}

impl CompositeBackend {
    /// Compose `subs`, fastest layer first
    pub fn new(subs: Vec<Box<dyn CacheBackend>>) -> Self {
        Self { subs }
    }

    /// Convenience for the common two-layer stack: an in-process front
    /// in front of a durable back
    pub fn staggered(front: Box<dyn CacheBackend>, back: Box<dyn CacheBackend>) -> Self {
        Self::new(vec![front, back])
    }
}

impl CacheBackend for CompositeBackend {
    fn name(&self) -> &str {
        "composite"
    }

    fn is_persistent(&self) -> bool {
        self.subs.iter().any(|sub| sub.is_persistent())
    }

    fn has_item(&self, key: &str) -> Result<bool> {
        for sub in &self.subs {
            if sub.has_item(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn item(&self, key: &str) -> Result<CacheItem> {
        for (depth, sub) in self.subs.iter().enumerate() {
            let item = sub.item(key)?;
            if item.is_miss() {
                continue;
            }
            for front in &self.subs[..depth] {
                front.save(item.clone())?;
            }
            if depth > 0 {
                debug!(key, from = sub.name(), "Promoted cache entry to front layers");
            }
            return Ok(item);
        }
        Ok(CacheItem::miss(key))
    }

    fn items(&self, keys: &[StorageKey]) -> Result<Vec<CacheItem>> {
        keys.iter().map(|key| self.item(key)).collect()
    }

    fn save(&self, item: CacheItem) -> Result<bool> {
        let mut all = true;
        for sub in &self.subs {
            all &= sub.save(item.clone())?;
        }
        Ok(all)
    }

    fn save_deferred(&self, item: CacheItem) -> Result<bool> {
        let mut all = true;
        for sub in &self.subs {
            all &= sub.save_deferred(item.clone())?;
        }
        Ok(all)
    }

    fn commit(&self) -> Result<bool> {
        let mut all = true;
        for sub in &self.subs {
            all &= sub.commit()?;
        }
        Ok(all)
    }

    fn delete_item(&self, key: &str) -> Result<bool> {
        let mut all = true;
        for sub in &self.subs {
            all &= sub.delete_item(key)?;
        }
        Ok(all)
    }

    fn clear(&self) -> Result<bool> {
        let mut all = true;
        for sub in &self.subs {
            all &= sub.clear()?;
        }
        Ok(all)
    }

    fn purge(&self) -> Result<bool> {
        let mut all = true;
        for sub in &self.subs {
            all &= sub.purge()?;
        }
        Ok(all)
    }

    fn sub_backends(&self) -> &[Box<dyn CacheBackend>] {
        &self.subs
    }
}
