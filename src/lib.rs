//! FastBam2fq - Coordinate-sorted BAM to paired FASTQ
//!
//! Mates of a pair can sit far apart in a coordinate-sorted file, so one
//! mate is buffered until its partner is read. The buffer is split into
//! genomic windows, each with its own lock, so many scanning threads can
//! feed it at once while memory stays proportional to local coverage.
//!
//! # Features
//!
//! - Lock striping by genomic window, one lock per `add`
//! - Parallel per-contig scanning with rayon
//! - Gzip FASTQ output
//!
//! # Example
//!
//! ```ignore
//! use fast_bam2fq::{CacheConfig, CollectingSink, ContigCatalogue, ReadCache};
//!
//! let catalogue = ContigCatalogue::from_sizes_file("hg38.chrom.sizes")?;
//! let mut cache = ReadCache::new(&catalogue, CacheConfig::default(), CollectingSink::new())?;
//!
//! cache.add(read)?;
//! cache.flush()?;
//! cache.log_stats();
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use core::{
    CacheConfig, CacheError, CacheStats, CatalogueError, CollectingSink, ContigCatalogue,
    PairKey, PartitionCache, ReadCache, ReadFlags, ReadSink, Route,
    SequencingRead,
};
pub use formats::fastq;
