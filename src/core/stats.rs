//! Running counters for the read cache

use log::{log, Level};

/// Pairing statistics for one partition or a fold of many
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads accepted into a partition
    pub reads_added: u64,
    /// Pairs completed and handed to the sink
    pub pairs_completed: u64,
    /// Reads emitted alone (flush or duplicate eviction)
    pub singletons_emitted: u64,
    /// Buffered reads displaced by a second read with the same key
    pub duplicates_evicted: u64,
    /// Secondary/supplementary records excluded from pairing
    pub reads_skipped: u64,
    /// Largest buffered count observed
    pub peak_buffered: u64,
}

impl CacheStats {
    /// Fold `other` into `self`
    ///
    /// Counters add; the peak is the larger of the two.
    pub fn merge(&mut self, other: &CacheStats) {
        self.reads_added += other.reads_added;
        self.pairs_completed += other.pairs_completed;
        self.singletons_emitted += other.singletons_emitted;
        self.duplicates_evicted += other.duplicates_evicted;
        self.reads_skipped += other.reads_skipped;
        self.peak_buffered = self.peak_buffered.max(other.peak_buffered);
    }

    /// Reads still waiting for a mate according to the counters
    pub fn buffered(&self) -> u64 {
        self.reads_added
            .saturating_sub(2 * self.pairs_completed)
            .saturating_sub(self.singletons_emitted)
    }

    /// Emit counters at info level
    pub fn log(&self, label: &str) {
        self.log_at(Level::Info, label);
    }

    pub fn log_at(&self, level: Level, label: &str) {
        log!(
            level,
            "{}: added={} pairs={} singletons={} duplicates={} skipped={} peak_buffered={} buffered={}",
            label,
            self.reads_added,
            self.pairs_completed,
            self.singletons_emitted,
            self.duplicates_evicted,
            self.reads_skipped,
            self.peak_buffered,
            self.buffered(),
        );
    }
}
