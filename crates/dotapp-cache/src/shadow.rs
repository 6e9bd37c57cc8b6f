//! Process-local shadow of the durable store.
//!
//! One map shared by every instance and every driver in the process, keyed
//! by derived identifier. Drivers consult it before touching durable
//! storage and populate it after a successful durable read or write; every
//! durable delete or clear purges it as well, so it never diverges from
//! the backend.
//!
//! Entries carry their own expiration so a stale shadow hit can never
//! outlive the durable entry it mirrors; expired entries are evicted
//! lazily on access.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;
use serde_json::Value;

/// Shadowed payload with its absolute expiration.
struct ShadowEntry {
    payload: Arc<Value>,
    /// `None` means the durable entry never expires.
    expires_at: Option<SystemTime>,
}

impl ShadowEntry {
    fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(at) if now > at)
    }
}

/// Process-wide cache-of-the-cache.
///
/// Thread-safe; shared as `Arc<MemoryShadow>` between the facade and the
/// active driver.
pub struct MemoryShadow {
    entries: DashMap<String, ShadowEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryShadow {
    /// Creates an empty shadow.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the live payload for `id`, if any.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn get(&self, id: &str) -> Option<Arc<Value>> {
        let now = SystemTime::now();

        if let Some(entry) = self.entries.get(id) {
            if !entry.is_expired(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.payload));
            }
            drop(entry);
            self.entries.remove(id);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores or refreshes a payload under `id`.
    pub fn put(&self, id: impl Into<String>, payload: Arc<Value>, expires_at: Option<SystemTime>) {
        self.entries.insert(
            id.into(),
            ShadowEntry {
                payload,
                expires_at,
            },
        );
    }

    /// Removes a single entry.
    pub fn remove(&self, id: &str) {
        self.entries.remove(id);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently shadowed (live or not yet evicted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the shadow holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the shadow counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryShadow {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryShadow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryShadow")
            .field("size", &self.entries.len())
            .finish()
    }
}

/// Shadow statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently in the shadow.
    pub size: usize,
    /// Number of shadow hits.
    pub hits: u64,
    /// Number of shadow misses.
    pub misses: u64,
    /// Number of entries evicted on access after expiring.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
