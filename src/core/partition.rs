//! Genomic window partitioning
//!
//! Maps a read to the partition that buffers it. Both mates of a pair must
//! land in the same partition, so the second mate is routed by the first
//! mate's coordinates (carried in its mate fields).
//!
//! | self     | mate     | routed by                         |
//! |----------|----------|-----------------------------------|
//! | unmapped | unmapped | sentinel                          |
//! | mapped   | unmapped | own coordinates                   |
//! | unmapped | mapped   | mate coordinates                  |
//! | mapped   | mapped   | own if first of pair, else mate   |
//!
//! Missing coordinates on the chosen side send the read to the sentinel,
//! where it surfaces as a singleton on flush.

use crate::core::read::SequencingRead;

/// Default window size in base pairs
pub const DEFAULT_WINDOW_SIZE: u64 = 1_000_000;

/// Target partition of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route<'a> {
    /// Bucket for reads whose pair is entirely unmapped (or lacks coordinates)
    Sentinel,
    /// Window `index` of `contig`, chosen from 1-based `position`
    Window {
        contig: &'a str,
        position: u64,
        index: usize,
    },
}

/// Window index of a 1-based position
///
/// Position 0 (unset in SAM) falls into the first window.
///
/// # Examples
/// ```
/// use fast_bam2fq::core::partition_index;
/// assert_eq!(partition_index(1, 1000), 0);
/// assert_eq!(partition_index(1000, 1000), 0);
/// assert_eq!(partition_index(1001, 1000), 1);
/// assert_eq!(partition_index(0, 1000), 0);
/// ```
#[inline]
pub fn partition_index(position: u64, window_size: u64) -> usize {
    (position.saturating_sub(1) / window_size) as usize
}

/// Number of windows needed to cover a contig
///
/// An empty contig still gets one window.
#[inline]
pub fn partition_count(length: u64, window_size: u64) -> usize {
    (length.div_ceil(window_size) as usize).max(1)
}

/// Route a read to its partition
pub fn route(read: &SequencingRead, window_size: u64) -> Route<'_> {
    let flags = &read.flags;
    if flags.is_fully_unmapped() {
        return Route::Sentinel;
    }
    let use_own = match (flags.unmapped, flags.mate_unmapped) {
        (false, true) => true,
        (true, false) => false,
        _ => flags.first_of_pair,
    };

    let (contig, position) = if use_own {
        (read.contig.as_deref(), read.position)
    } else {
        (read.mate_contig.as_deref(), read.mate_position)
    };

    match (contig, position) {
        (Some(contig), Some(position)) => Route::Window {
            contig,
            position,
            index: partition_index(position, window_size),
        },
        _ => Route::Sentinel,
    }
}
