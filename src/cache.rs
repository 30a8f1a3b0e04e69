//! Extraction cache: fingerprint → [`RawRecord`] with a time-to-live.
//!
//! Re-uploads of the same photo must not cost another model call. The cache
//! is shared by every submission in the process and only ever holds records
//! that parsed successfully; failed extractions are never written.
//!
//! [`MemoryCache`] is a [`DashMap`]: each key lives in one shard behind its
//! own lock, so a reader sees either the whole entry or none of it, and
//! writers to different keys never contend on a global lock. Expiry uses
//! [`tokio::time::Instant`] so tests can drive it with a paused clock.
//!
//! Expired entries are dropped when their key is read, and every
//! [`PURGE_INTERVAL`] inserts the whole map is swept.

use crate::pipeline::fingerprint::Fingerprint;
use crate::record::RawRecord;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Inserts between two sweeps of expired entries.
pub const PURGE_INTERVAL: usize = 64;

static SHARED_CACHE: Lazy<Arc<MemoryCache>> = Lazy::new(|| Arc::new(MemoryCache::new()));

/// The process-wide cache used by pipelines configured without one.
pub fn shared_cache() -> Arc<MemoryCache> {
    Arc::clone(&SHARED_CACHE)
}

/// Storage behind the extraction client.
///
/// Implementations must be safe to share across concurrent submissions.
pub trait ExtractionCache: Send + Sync {
    /// The live record for `key`, if any. Expired entries count as absent.
    fn get(&self, key: &Fingerprint) -> Option<RawRecord>;

    /// Store `record` under `key` for `ttl`, replacing any previous entry.
    fn insert(&self, key: Fingerprint, record: RawRecord, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: RawRecord,
    /// `None` when the TTL reaches past what the clock can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process cache used when no other store is configured.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<Fingerprint, CacheEntry>,
    inserts: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }
}

impl ExtractionCache for MemoryCache {
    fn get(&self, key: &Fingerprint) -> Option<RawRecord> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.record.clone());
            }
        }
        // The shard guard is released above; only drop the entry if no
        // writer refreshed it in between.
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        None
    }

    fn insert(&self, key: Fingerprint, record: RawRecord, ttl: Duration) {
        let entry = CacheEntry {
            record,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.insert(key, entry);

        let inserted = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserted % PURGE_INTERVAL == 0 {
            let purged = self.purge_expired();
            if purged > 0 {
                debug!("Purged {} expired cache entries", purged);
            }
        }
    }
}
