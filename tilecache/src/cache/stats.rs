//! Cache statistics tracking and reporting.

/// Cache statistics for monitoring and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    // Memory cache metrics
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub memory_entry_count: usize,
    pub memory_evictions: u64,
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate memory cache hit rate (0.0 to 1.0).
    pub fn memory_hit_rate(&self) -> f64 {
        let total = self.memory_hits + self.memory_misses;
        if total == 0 {
            0.0
        } else {
            self.memory_hits as f64 / total as f64
        }
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_memory_miss(&mut self) {
        self.memory_misses += 1;
    }

    pub fn record_memory_evictions(&mut self, count: u64) {
        self.memory_evictions += count;
    }
}
