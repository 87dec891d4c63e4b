//! Buffer pool counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event counters kept by a [`BufferPoolManager`](super::BufferPoolManager).
///
/// Counters are independent and updated with relaxed atomics; a
/// [`StatsSnapshot`] is consistent per counter, not across counters.
#[derive(Debug, Default)]
pub struct PoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    dirty_writebacks: AtomicU64,
    pages_read: AtomicU64,
    pages_written: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_eviction(&self, was_dirty: bool) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        if was_dirty {
            self.dirty_writebacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.pages_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            dirty_writebacks: self.dirty_writebacks.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.dirty_writebacks,
            &self.pages_read,
            &self.pages_written,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Plain copy of [`PoolStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Evictions that had to write the victim back first.
    pub dirty_writebacks: u64,
    pub pages_read: u64,
    pub pages_written: u64,
}

impl StatsSnapshot {
    /// Fraction of fetches served without I/O, 0.0 when nothing was fetched.
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} hit_rate={:.1}% evictions={} (dirty {}) reads={} writes={}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions,
            self.dirty_writebacks,
            self.pages_read,
            self.pages_written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = PoolStats::new();
        assert_eq!(stats.snapshot().hit_rate(), 0.0);

        for _ in 0..3 {
            stats.record_hit();
        }
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.75);
    }

    #[test]
    fn test_eviction_counts_dirty_writebacks() {
        let stats = PoolStats::new();
        stats.record_eviction(false);
        stats.record_eviction(true);

        let snap = stats.snapshot();
        assert_eq!(snap.evictions, 2);
        assert_eq!(snap.dirty_writebacks, 1);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_display() {
        let stats = PoolStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_eviction(true);

        let text = stats.snapshot().to_string();
        assert!(text.contains("hit_rate=50.0%"));
        assert!(text.contains("evictions=1 (dirty 1)"));
    }
}
