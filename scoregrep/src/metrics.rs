use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Tracks throughput and matching counters for a run.
///
/// Cloning shares the underlying counters, so a clone handed to a worker
/// thread reports into the same totals as the dispatcher's copy.
#[derive(Debug, Clone)]
pub struct FilterMetrics {
    // Line flow
    lines_read: Arc<AtomicU64>,
    lines_emitted: Arc<AtomicU64>,
    cycles_completed: Arc<AtomicU64>,

    // Matching
    pattern_matches: Arc<AtomicU64>,

    // Compiled pattern cache
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl FilterMetrics {
    /// Creates a new FilterMetrics instance
    pub fn new() -> Self {
        Self {
            lines_read: Arc::new(AtomicU64::new(0)),
            lines_emitted: Arc::new(AtomicU64::new(0)),
            cycles_completed: Arc::new(AtomicU64::new(0)),
            pattern_matches: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_line_emitted(&self) {
        self.lines_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.pattern_matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lookup in the compiled pattern cache
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a snapshot of all counters
    pub fn get_stats(&self) -> FilterStats {
        FilterStats {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_emitted: self.lines_emitted.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            pattern_matches: self.pattern_matches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Filter stats:\n\
             Lines read/emitted: {}/{}\n\
             Cycles completed: {}\n\
             Pattern matches: {}\n\
             Pattern cache hits/misses: {}/{}",
            stats.lines_read,
            stats.lines_emitted,
            stats.cycles_completed,
            stats.pattern_matches,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

impl Default for FilterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`FilterMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub lines_read: u64,
    pub lines_emitted: u64,
    pub cycles_completed: u64,
    pub pattern_matches: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_tracking() {
        let metrics = FilterMetrics::new();

        metrics.record_line_read();
        metrics.record_line_read();
        metrics.record_cycle();
        metrics.record_cycle();
        metrics.record_line_emitted();

        let stats = metrics.get_stats();
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.lines_emitted, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = FilterMetrics::new();
        let worker_view = metrics.clone();

        let handle = std::thread::spawn(move || {
            for _ in 0..100 {
                worker_view.record_match();
            }
        });
        handle.join().unwrap();

        assert_eq!(metrics.get_stats().pattern_matches, 100);
    }

    #[test]
    fn test_cache_metrics() {
        let metrics = FilterMetrics::new();

        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(false);
        metrics.record_cache_lookup(false);

        assert_eq!(metrics.cache_hits(), 1);
        assert_eq!(metrics.cache_misses(), 2);
    }
}
