//! Evictable in-memory thumbnail cache for list and grid displays.
//!
//! Keyed by [`RecordId`], bounded by entry count with least-recently-used
//! eviction. [`ThumbnailCache::on_memory_pressure`] drops everything; the
//! next lookup recomputes from the record.
//!
//! The cache holds the same `Arc<Photo>` a record hands out, so keeping a
//! thumbnail here after the record purged its own slot costs no copy.

use crate::error::Result;
use crate::imaging::Photo;
use crate::record::StereogramRecord;
use crate::types::RecordId;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Default number of thumbnails kept in memory.
pub const DEFAULT_CAPACITY: usize = 256;

/// Hit/miss counters since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub evictions: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} rendered ({} total)",
            self.hits,
            self.misses,
            self.total()
        )?;
        if self.evictions > 0 {
            write!(f, ", {} evicted", self.evictions)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ThumbnailCache {
    capacity: usize,
    entries: HashMap<RecordId, Arc<Photo>>,
    /// Least recently used at the front.
    order: VecDeque<RecordId>,
    stats: CacheStats,
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ThumbnailCache {
    /// A cache holding at most `capacity` thumbnails (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    fn touch(&mut self, id: &RecordId) {
        if let Some(pos) = self.order.iter().position(|k| k == id) {
            self.order.remove(pos);
        }
        self.order.push_back(id.clone());
    }

    /// Look up a thumbnail, marking it recently used.
    pub fn get(&mut self, id: &RecordId) -> Option<Arc<Photo>> {
        let thumb = self.entries.get(id).cloned()?;
        self.touch(id);
        Some(thumb)
    }

    pub fn insert(&mut self, id: RecordId, thumbnail: Arc<Photo>) {
        self.touch(&id);
        self.entries.insert(id, thumbnail);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            log::debug!("event=thumbnail_evicted module=thumbnail_cache id={}", oldest);
        }
    }

    /// Cached thumbnail for `record`, rendering it on a miss.
    pub fn get_or_load(&mut self, record: &StereogramRecord) -> Result<Arc<Photo>> {
        if let Some(thumb) = self.get(record.id()) {
            self.stats.hits += 1;
            return Ok(thumb);
        }
        self.stats.misses += 1;
        let thumb = record.thumbnail_image()?;
        self.insert(record.id().clone(), Arc::clone(&thumb));
        Ok(thumb)
    }

    /// Forget one record, e.g. after it was deleted or its halves swapped.
    pub fn evict(&mut self, id: &RecordId) -> Option<Arc<Photo>> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|k| k != id);
        Some(removed)
    }

    /// Drop every thumbnail.
    pub fn on_memory_pressure(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.order.clear();
        log::info!(
            "event=thumbnail_cache_purged module=thumbnail_cache dropped={}",
            dropped
        );
    }
}
