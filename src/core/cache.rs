//! Partitioned read cache
//!
//! Routes every incoming read to one [`PartitionCache`] and keeps a global
//! buffered-read counter. Producer threads share `&ReadCache` and call
//! [`ReadCache::add`] concurrently; each call takes exactly one partition
//! lock, so calls only contend when their reads land in the same window.
//!
//! [`ReadCache::flush`] takes `&mut self`: scanning must be finished (all
//! producer borrows released) before leftovers are drained.

use crate::core::catalogue::ContigCatalogue;
use crate::core::error::{CacheError, CacheResult};
use crate::core::partition::{partition_count, route, Route, DEFAULT_WINDOW_SIZE};
use crate::core::partition_cache::PartitionCache;
use crate::core::read::SequencingRead;
use crate::core::sink::ReadSink;
use crate::core::stats::CacheStats;
use log::{debug, info, log_enabled, Level};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Read cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Genomic window covered by one partition, in base pairs
    pub window_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn with_window_size(window_size: u64) -> Self {
        Self { window_size }
    }
}

/// Partitions of one contig
#[derive(Debug)]
struct ContigPartitions {
    name: String,
    length: u64,
    windows: Vec<PartitionCache>,
}

/// Concurrent mate-pairing cache partitioned by genomic window
pub struct ReadCache<S: ReadSink> {
    window_size: u64,
    contigs: Vec<ContigPartitions>,
    by_name: HashMap<String, usize>,
    sentinel: PartitionCache,
    size: AtomicUsize,
    peak: AtomicUsize,
    skipped: AtomicU64,
    sink: S,
}

impl<S: ReadSink> ReadCache<S> {
    /// Lay out one partition per contig window plus the unmapped sentinel
    pub fn new(catalogue: &ContigCatalogue, config: CacheConfig, sink: S) -> CacheResult<Self> {
        let window_size = config.window_size;
        if window_size == 0 {
            return Err(CacheError::InvalidWindowSize(window_size));
        }

        let mut contigs = Vec::with_capacity(catalogue.len());
        let mut by_name = HashMap::with_capacity(catalogue.len());
        for (name, length) in catalogue.iter() {
            let count = partition_count(length, window_size);
            by_name.insert(name.to_string(), contigs.len());
            contigs.push(ContigPartitions {
                name: name.to_string(),
                length,
                windows: (0..count).map(|_| PartitionCache::new()).collect(),
            });
        }

        let cache = Self {
            window_size,
            contigs,
            by_name,
            sentinel: PartitionCache::new(),
            size: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            skipped: AtomicU64::new(0),
            sink,
        };
        debug!(
            "Read cache: {} contigs, {} partitions, window size {}",
            cache.contigs.len(),
            cache.partition_count(),
            window_size
        );
        Ok(cache)
    }

    /// Pair `read` with its buffered mate, or buffer it until the mate arrives
    ///
    /// Secondary and supplementary records are excluded from pairing and
    /// only counted. Fails on a contig missing from the catalogue or a
    /// position past the contig's last window.
    pub fn add(&self, read: SequencingRead) -> CacheResult<()> {
        if read.flags.is_secondary_or_supplementary() {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let partition = self.partition_for(&read)?;
        let mut guard = partition.lock();
        let before = guard.len();
        let result = guard.add(read, &self.sink);
        let after = guard.len();
        self.apply_delta(before, after);
        drop(guard);

        result.map_err(CacheError::from)
    }

    fn partition_for(&self, read: &SequencingRead) -> CacheResult<&PartitionCache> {
        match route(read, self.window_size) {
            Route::Sentinel => Ok(&self.sentinel),
            Route::Window {
                contig,
                position,
                index,
            } => {
                let &idx = self
                    .by_name
                    .get(contig)
                    .ok_or_else(|| CacheError::UnknownContig(contig.to_string()))?;
                let partitions = &self.contigs[idx];
                partitions
                    .windows
                    .get(index)
                    .ok_or_else(|| CacheError::PositionOutOfRange {
                        contig: contig.to_string(),
                        position,
                        length: partitions.length,
                    })
            }
        }
    }

    fn apply_delta(&self, before: usize, after: usize) {
        if after > before {
            let grown = after - before;
            let size = self.size.fetch_add(grown, Ordering::SeqCst) + grown;
            self.peak.fetch_max(size, Ordering::Relaxed);
        } else if before > after {
            self.size.fetch_sub(before - after, Ordering::SeqCst);
        }
    }

    /// Emit every read still waiting for a mate as a singleton
    ///
    /// Returns the number of singletons emitted; a second call emits none.
    /// On a sink error the reads not yet written remain buffered and
    /// counted in `size()`.
    pub fn flush(&mut self) -> CacheResult<usize> {
        let sink = &self.sink;
        let size = &self.size;
        let partitions = self
            .contigs
            .iter_mut()
            .flat_map(|c| c.windows.iter_mut())
            .chain(std::iter::once(&mut self.sentinel));

        let mut flushed = 0;
        for partition in partitions {
            let before = partition.buffered();
            let result = partition.flush(sink);
            // reads the sink rejected stay buffered
            size.fetch_sub(before - partition.buffered(), Ordering::SeqCst);
            flushed += result?;
        }

        if flushed > 0 {
            info!("Flushed {} unpaired reads as singletons", flushed);
        }
        Ok(flushed)
    }

    /// Number of reads currently buffered across all partitions
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Largest value `size()` has reached
    pub fn peak_size(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Total partitions including the sentinel
    pub fn partition_count(&self) -> usize {
        self.contigs.iter().map(|c| c.windows.len()).sum::<usize>() + 1
    }

    /// Number of windows laid out for a contig
    pub fn contig_partition_count(&self, contig: &str) -> Option<usize> {
        self.by_name.get(contig).map(|&i| self.contigs[i].windows.len())
    }

    fn partitions(&self) -> impl Iterator<Item = &PartitionCache> {
        self.contigs
            .iter()
            .flat_map(|c| c.windows.iter())
            .chain(std::iter::once(&self.sentinel))
    }

    /// Fold every partition's counters into one total
    ///
    /// Exact once producers have stopped.
    pub fn stats(&self) -> CacheStats {
        let mut total = CacheStats::default();
        for partition in self.partitions() {
            total.merge(&partition.stats());
        }
        total.reads_skipped += self.skipped.load(Ordering::Relaxed);
        total.peak_buffered = total.peak_buffered.max(self.peak_size() as u64);
        total
    }

    /// Fold another cache's counters into this one, partition by partition
    ///
    /// Both caches must share window size and contig layout.
    pub fn merge_stats<T: ReadSink>(&self, other: &ReadCache<T>) -> CacheResult<()> {
        self.check_layout(other)?;

        for (mine, theirs) in self.partitions().zip(other.partitions()) {
            mine.merge_stats(theirs);
        }
        self.skipped
            .fetch_add(other.skipped.load(Ordering::Relaxed), Ordering::Relaxed);
        self.peak.fetch_max(other.peak_size(), Ordering::Relaxed);
        Ok(())
    }

    fn check_layout<T: ReadSink>(&self, other: &ReadCache<T>) -> CacheResult<()> {
        if self.window_size != other.window_size {
            return Err(CacheError::IncompatibleLayout(format!(
                "window size {} != {}",
                self.window_size, other.window_size
            )));
        }
        if self.contigs.len() != other.contigs.len() {
            return Err(CacheError::IncompatibleLayout(format!(
                "{} contigs != {} contigs",
                self.contigs.len(),
                other.contigs.len()
            )));
        }
        for (a, b) in self.contigs.iter().zip(&other.contigs) {
            if a.name != b.name || a.windows.len() != b.windows.len() {
                return Err(CacheError::IncompatibleLayout(format!(
                    "contig {} ({} windows) != {} ({} windows)",
                    a.name,
                    a.windows.len(),
                    b.name,
                    b.windows.len()
                )));
            }
        }
        Ok(())
    }

    /// Log aggregate counters, plus per-partition detail at debug level
    pub fn log_stats(&self) {
        if log_enabled!(Level::Debug) {
            for contig in &self.contigs {
                for (i, window) in contig.windows.iter().enumerate() {
                    let start = i as u64 * self.window_size + 1;
                    let end = ((i as u64 + 1) * self.window_size).min(contig.length);
                    window.log_stats(&format!("{}:{}-{}", contig.name, start, end));
                }
            }
            self.sentinel.log_stats("unmapped");
        }

        info!(
            "Read cache: {} partitions, window size {}, {} reads buffered",
            self.partition_count(),
            self.window_size,
            self.size()
        );
        self.stats().log("Read cache totals");
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::read::ReadFlags;
    use crate::core::sink::CollectingSink;

    fn catalogue() -> ContigCatalogue {
        ContigCatalogue::from_contigs([("1", 2500u64), ("2", 1000)]).unwrap()
    }

    fn cache() -> ReadCache<CollectingSink> {
        ReadCache::new(&catalogue(), CacheConfig::with_window_size(1000), CollectingSink::new())
            .unwrap()
    }

    fn mates(name: &str, pos1: u64, pos2: u64) -> (SequencingRead, SequencingRead) {
        let r1 = SequencingRead::new(name, true).at("1", pos1).with_mate_at("1", pos2);
        let r2 = SequencingRead::new(name, false).at("1", pos2).with_mate_at("1", pos1);
        (r1, r2)
    }

    #[test]
    fn test_layout() {
        let cache = cache();
        assert_eq!(cache.contig_partition_count("1"), Some(3));
        assert_eq!(cache.contig_partition_count("2"), Some(1));
        assert_eq!(cache.contig_partition_count("3"), None);
        assert_eq!(cache.partition_count(), 5);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let result = ReadCache::new(&catalogue(), CacheConfig::with_window_size(0), CollectingSink::new());
        assert!(matches!(result, Err(CacheError::InvalidWindowSize(0))));
    }

    #[test]
    fn test_worked_example_both_orders() {
        for swap in [false, true] {
            let cache = cache();
            let (r1, r2) = mates("frag", 1500, 1500);
            let (a, b) = if swap { (r2, r1) } else { (r1, r2) };

            cache.add(a).unwrap();
            assert_eq!(cache.size(), 1);
            cache.add(b).unwrap();
            assert_eq!(cache.size(), 0);
            assert_eq!(cache.sink().pair_count(), 1);
        }
    }

    #[test]
    fn test_cross_contig_pair_converges() {
        let cache = cache();
        let r1 = SequencingRead::new("x", true).at("1", 2400).with_mate_at("2", 10);
        let r2 = SequencingRead::new("x", false).at("2", 10).with_mate_at("1", 2400);
        cache.add(r2).unwrap();
        cache.add(r1).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.sink().pair_count(), 1);
    }

    #[test]
    fn test_unknown_contig_is_error() {
        let cache = cache();
        let read = SequencingRead::new("x", true).at("chrUn", 10).with_mate_at("chrUn", 20);
        let err = cache.add(read).unwrap_err();
        assert!(matches!(err, CacheError::UnknownContig(c) if c == "chrUn"));
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_position_past_contig_is_error() {
        let cache = cache();
        let read = SequencingRead::new("x", true).at("2", 5000).with_mate_at("2", 5000);
        let err = cache.add(read).unwrap_err();
        assert!(matches!(err, CacheError::PositionOutOfRange { position: 5000, length: 1000, .. }));
    }

    #[test]
    fn test_secondary_is_skipped() {
        let cache = cache();
        let mut read = SequencingRead::new("x", true).at("1", 10).with_mate_at("1", 20);
        read.flags.secondary = true;
        cache.add(read).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().reads_skipped, 1);
        assert_eq!(cache.stats().reads_added, 0);
    }

    #[test]
    fn test_mapped_read_with_unmapped_mate_pairs_by_own_position() {
        let cache = cache();
        // SAM convention: the unmapped mate is placed at the mapped mate's coordinates
        let mapped = SequencingRead::new("m", false).at("1", 1200);
        let mut unmapped = SequencingRead::new("m", true).with_mate_at("1", 1200);
        unmapped.contig = Some("1".to_string());
        unmapped.position = Some(1200);

        cache.add(mapped).unwrap();
        assert_eq!(cache.size(), 1);
        cache.add(unmapped).unwrap();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.sink().pair_count(), 1);
    }

    #[test]
    fn test_flush_emits_singletons_once() {
        let mut cache = cache();
        cache.add(mates("a", 100, 2100).0).unwrap();
        let unmapped = SequencingRead::new("u", false).with_flags(ReadFlags::from_sam(0x1 | 0x4 | 0x8 | 0x80));
        cache.add(unmapped).unwrap();
        assert_eq!(cache.size(), 2);

        assert_eq!(cache.flush().unwrap(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.flush().unwrap(), 0);
        assert_eq!(cache.sink().singleton_count(), 2);

        let stats = cache.stats();
        assert_eq!(stats.singletons_emitted, 2);
        assert_eq!(stats.buffered(), 0);
    }

    #[test]
    fn test_stats_totals() {
        let mut cache = cache();
        let (r1, r2) = mates("a", 100, 300);
        cache.add(r1).unwrap();
        cache.add(r2).unwrap();
        cache.add(mates("b", 1100, 1300).0).unwrap();
        cache.add(mates("c", 2100, 2300).1).unwrap();
        assert_eq!(cache.peak_size(), 2);

        cache.flush().unwrap();
        let stats = cache.stats();
        assert_eq!(stats.reads_added, 4);
        assert_eq!(stats.pairs_completed, 1);
        assert_eq!(stats.singletons_emitted, 2);
        assert_eq!(stats.peak_buffered, 2);
        cache.log_stats();
    }

    #[test]
    fn test_merge_stats() {
        let a = cache();
        let b = cache();
        a.add(mates("a", 100, 300).0).unwrap();
        b.add(mates("b", 100, 300).0).unwrap();
        b.add(mates("c", 1500, 1600).0).unwrap();

        a.merge_stats(&b).unwrap();
        let stats = a.stats();
        assert_eq!(stats.reads_added, 3);
        assert_eq!(stats.peak_buffered, 2);
    }

    #[test]
    fn test_merge_stats_incompatible_layout() {
        let a = cache();
        let b = ReadCache::new(&catalogue(), CacheConfig::with_window_size(500), CollectingSink::new())
            .unwrap();
        assert!(matches!(a.merge_stats(&b), Err(CacheError::IncompatibleLayout(_))));

        let other = ContigCatalogue::from_contigs([("1", 2500u64), ("X", 1000)]).unwrap();
        let c = ReadCache::new(&other, CacheConfig::with_window_size(1000), CollectingSink::new())
            .unwrap();
        assert!(matches!(a.merge_stats(&c), Err(CacheError::IncompatibleLayout(_))));
    }

    #[test]
    fn test_concurrent_adds() {
        let cache = cache();
        std::thread::scope(|s| {
            for t in 0..4 {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..250 {
                        let pos = (t * 600 + i) as u64 % 2500 + 1;
                        let (r1, r2) = mates(&format!("t{}-{}", t, i), pos, pos);
                        cache.add(r1).unwrap();
                        cache.add(r2).unwrap();
                    }
                });
            }
        });
        assert!(cache.is_empty());
        assert_eq!(cache.sink().pair_count(), 1000);
        assert_eq!(cache.stats().pairs_completed, 1000);
    }

    /// Rejects every write while `failing` is set
    #[derive(Default)]
    struct SwitchSink {
        failing: std::sync::atomic::AtomicBool,
        inner: CollectingSink,
    }

    impl SwitchSink {
        fn check(&self) -> std::io::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            Ok(())
        }
    }

    impl ReadSink for SwitchSink {
        fn write_pair(&self, first: &SequencingRead, second: &SequencingRead) -> std::io::Result<()> {
            self.check()?;
            self.inner.write_pair(first, second)
        }

        fn write_singleton(&self, read: &SequencingRead) -> std::io::Result<()> {
            self.check()?;
            self.inner.write_singleton(read)
        }
    }

    #[test]
    fn test_size_tracks_storage_across_sink_errors() {
        let mut cache =
            ReadCache::new(&catalogue(), CacheConfig::with_window_size(1000), SwitchSink::default())
                .unwrap();
        let (a1, a2) = mates("a", 100, 200);
        let (b1, _) = mates("b", 1500, 1600);
        cache.add(a1).unwrap();
        cache.add(b1.clone()).unwrap();
        assert_eq!(cache.size(), 2);

        cache.sink().failing.store(true, Ordering::SeqCst);
        // the completed pair leaves storage even though the write fails
        assert!(matches!(cache.add(a2), Err(CacheError::Sink(_))));
        assert_eq!(cache.size(), 1);
        // duplicate eviction is net zero
        assert!(matches!(cache.add(b1), Err(CacheError::Sink(_))));
        assert_eq!(cache.size(), 1);

        assert!(cache.flush().is_err());
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.stats().buffered(), 1);

        cache.sink().failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.flush().unwrap(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.sink().inner.singleton_count(), 1);
        assert_eq!(cache.stats().buffered(), 0);
    }
}
