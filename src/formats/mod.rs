//! File format adapters
//!
//! Adapters between the read cache and the outside world: BAM/SAM/CRAM
//! input and FASTQ output.

#[cfg(feature = "bam")]
pub mod bam;
pub mod fastq;

#[cfg(feature = "bam")]
pub use bam::{convert_bam, record_to_read, BamError, ConversionStats};
pub use fastq::{write_record, FastqCounts, FastqOutputs, FastqSink, OutputStream};
