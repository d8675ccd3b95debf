//! Core read pairing functionality
//!
//! This module contains the read model, genomic window partitioning,
//! the per-partition buffers and the concurrent read cache built on them.

mod cache;
mod catalogue;
pub mod dna;
mod error;
mod partition;
mod partition_cache;
mod read;
mod sink;
mod stats;

pub use cache::{CacheConfig, ReadCache};
pub use catalogue::{detect_compression, CompressionFormat, ContigCatalogue};
pub use error::{CacheError, CacheResult, CatalogueError, CatalogueResult};
pub use partition::{partition_count, partition_index, route, Route, DEFAULT_WINDOW_SIZE};
pub use partition_cache::{PartitionCache, PartitionGuard};
pub use read::{PairKey, ReadFlags, SequencingRead};
pub use sink::{CollectingSink, ReadSink};
pub use stats::CacheStats;
