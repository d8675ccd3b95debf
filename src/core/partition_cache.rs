//! Pending reads for one genomic window
//!
//! Each partition buffers at most one read per pair-identity key and pairs
//! it with its mate on arrival. Access from producer threads goes through
//! [`PartitionCache::lock`]; the returned guard releases the lock when
//! dropped, on every exit path.

use crate::core::read::{PairKey, SequencingRead};
use crate::core::sink::ReadSink;
use crate::core::stats::CacheStats;
use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;

#[derive(Debug, Default)]
struct PartitionState {
    pending: HashMap<PairKey, SequencingRead>,
    stats: CacheStats,
}

/// Buffer of reads waiting for their mate within one partition
#[derive(Debug, Default)]
pub struct PartitionCache {
    state: Mutex<PartitionState>,
}

/// Exclusive access to a partition, held for the lifetime of the guard
pub struct PartitionGuard<'a> {
    state: MutexGuard<'a, PartitionState>,
}

impl PartitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire this partition's lock
    pub fn lock(&self) -> PartitionGuard<'_> {
        PartitionGuard {
            state: self.state.lock(),
        }
    }

    /// Emit every buffered read as a singleton and clear storage
    ///
    /// Takes `&mut self`: no producer can hold the lock while a flush runs.
    /// Reads are emitted in name order and leave storage only once the sink
    /// has accepted them, so after a sink error the unwritten reads are
    /// still buffered and a later flush retries them.
    pub fn flush<S: ReadSink + ?Sized>(&mut self, sink: &S) -> io::Result<usize> {
        let state = self.state.get_mut();
        if state.pending.is_empty() {
            return Ok(0);
        }

        let mut keys: Vec<PairKey> = state.pending.keys().cloned().collect();
        keys.sort_by(|a, b| a.name.cmp(&b.name).then(b.first_of_pair.cmp(&a.first_of_pair)));

        let mut count = 0;
        for key in keys {
            let Some(read) = state.pending.get(&key) else {
                continue;
            };
            sink.write_singleton(read)?;
            state.pending.remove(&key);
            state.stats.singletons_emitted += 1;
            count += 1;
        }
        Ok(count)
    }

    /// Snapshot of this partition's counters
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    /// Fold `other`'s counters into this partition
    ///
    /// The other partition is read first and released before this one is
    /// locked, so at most one lock is held at a time.
    pub fn merge_stats(&self, other: &PartitionCache) {
        let theirs = other.stats();
        self.state.lock().stats.merge(&theirs);
    }

    /// Per-partition detail goes out at debug level
    pub fn log_stats(&self, label: &str) {
        self.stats().log_at(log::Level::Debug, label);
    }

    /// Buffered count through exclusive access, without locking
    pub fn buffered(&mut self) -> usize {
        self.state.get_mut().pending.len()
    }
}

impl PartitionGuard<'_> {
    /// Pair `read` with its buffered mate, or buffer it
    ///
    /// A completed pair leaves storage before it is handed to the sink.
    /// A second read with an already-buffered key displaces the earlier one,
    /// which is emitted as a singleton.
    pub fn add<S: ReadSink + ?Sized>(&mut self, read: SequencingRead, sink: &S) -> io::Result<()> {
        let state = &mut *self.state;
        state.stats.reads_added += 1;

        if let Some(mate) = state.pending.remove(&read.mate_key()) {
            state.stats.pairs_completed += 1;
            let (first, second) = if read.flags.first_of_pair {
                (read, mate)
            } else {
                (mate, read)
            };
            return sink.write_pair(&first, &second);
        }

        match state.pending.entry(read.pair_key()) {
            Entry::Occupied(mut entry) => {
                warn!(
                    "Duplicate read {} (first_of_pair={}), emitting earlier copy as singleton",
                    String::from_utf8_lossy(&read.name),
                    read.flags.first_of_pair
                );
                let earlier = entry.insert(read);
                state.stats.duplicates_evicted += 1;
                state.stats.singletons_emitted += 1;
                sink.write_singleton(&earlier)
            }
            Entry::Vacant(entry) => {
                entry.insert(read);
                let buffered = state.pending.len() as u64;
                if buffered > state.stats.peak_buffered {
                    state.stats.peak_buffered = buffered;
                    if buffered % 100_000 == 0 {
                        debug!("Partition buffer reached {} reads", buffered);
                    }
                }
                Ok(())
            }
        }
    }

    /// Number of buffered reads
    pub fn len(&self) -> usize {
        self.state.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.pending.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.stats
    }
}
