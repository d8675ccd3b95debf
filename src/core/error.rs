//! Error types for FastBam2fq
//!
//! Defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the read cache while routing and pairing reads
#[derive(Debug, Error)]
pub enum CacheError {
    /// Contig name not present in the catalogue the cache was built from
    #[error("Contig not found in reference catalogue: {0}")]
    UnknownContig(String),

    /// Position falls past the last partition of its contig
    #[error("Position {position} is beyond the end of contig {contig} (length {length})")]
    PositionOutOfRange {
        contig: String,
        position: u64,
        length: u64,
    },

    /// Window size must be positive
    #[error("Invalid window size: {0} (must be > 0)")]
    InvalidWindowSize(u64),

    /// Stats merged between caches with different partition layouts
    #[error("Incompatible cache layout: {0}")]
    IncompatibleLayout(String),

    /// The downstream sink failed to accept a pair or singleton
    #[error("Failed to write to sink: {0}")]
    Sink(#[from] std::io::Error),
}

/// Errors that can occur while loading a contig catalogue
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// Malformed sizes/fai line
    #[error("Invalid contig line at line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    /// Failed to parse contig length
    #[error("Failed to parse length '{value}' at line {line}")]
    InvalidLength { line: usize, value: String },

    /// The same contig appears twice
    #[error("Duplicate contig name: {0}")]
    DuplicateContig(String),

    /// Sizes file not found
    #[error("Contig sizes file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error during parsing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for read cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result type alias for catalogue loading
pub type CatalogueResult<T> = std::result::Result<T, CatalogueError>;
