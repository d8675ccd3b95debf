//! Reference contig catalogue
//!
//! Ordered contig name → length table used to lay out partitions.
//! Loaded from a BAM header or from a chrom.sizes / FASTA `.fai` file.
//!
//! # Sizes File Format
//!
//! ```text
//! chr1	248956422
//! chr2	242193529
//! ```
//!
//! Only the first two tab-separated columns are read, so a `.fai` index
//! works unchanged.

use crate::core::error::{CatalogueError, CatalogueResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Compression format of a sizes file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Contig names and lengths in reference order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContigCatalogue {
    contigs: Vec<(String, u64)>,
    by_name: HashMap<String, usize>,
}

impl ContigCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, length)` pairs, rejecting duplicate names
    pub fn from_contigs<I, N>(contigs: I) -> CatalogueResult<Self>
    where
        I: IntoIterator<Item = (N, u64)>,
        N: Into<String>,
    {
        let mut catalogue = Self::new();
        for (name, length) in contigs {
            catalogue.push(name, length)?;
        }
        Ok(catalogue)
    }

    /// Append a contig
    pub fn push(&mut self, name: impl Into<String>, length: u64) -> CatalogueResult<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(CatalogueError::DuplicateContig(name));
        }
        self.by_name.insert(name.clone(), self.contigs.len());
        self.contigs.push((name, length));
        Ok(())
    }

    /// Load a chrom.sizes or `.fai` file, plain or compressed
    pub fn from_sizes_file<P: AsRef<Path>>(path: P) -> CatalogueResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CatalogueError::FileNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        match detect_compression(path)? {
            CompressionFormat::Gzip => {
                let decoder = flate2::read::MultiGzDecoder::new(file);
                Self::from_reader(BufReader::new(decoder))
            }
            CompressionFormat::Bzip2 => {
                let decoder = bzip2::read::BzDecoder::new(file);
                Self::from_reader(BufReader::new(decoder))
            }
            CompressionFormat::Plain => Self::from_reader(BufReader::new(file)),
        }
    }

    /// Parse sizes lines from any reader
    pub fn from_reader<R: BufRead>(reader: R) -> CatalogueResult<Self> {
        let mut catalogue = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split('\t');
            let name = fields.next().unwrap_or("");
            let length = fields.next().ok_or_else(|| CatalogueError::InvalidLine {
                line: line_number,
                message: format!("expected '<name>\\t<length>', got '{}'", trimmed),
            })?;
            if name.is_empty() {
                return Err(CatalogueError::InvalidLine {
                    line: line_number,
                    message: "empty contig name".to_string(),
                });
            }
            let length: u64 = length.trim().parse().map_err(|_| CatalogueError::InvalidLength {
                line: line_number,
                value: length.to_string(),
            })?;

            catalogue.push(name, length)?;
        }

        Ok(catalogue)
    }

    /// Build from the `@SQ` lines of a BAM header
    #[cfg(feature = "bam")]
    pub fn from_header(header: &rust_htslib::bam::HeaderView) -> CatalogueResult<Self> {
        let mut catalogue = Self::new();
        for tid in 0..header.target_count() {
            let name = String::from_utf8_lossy(header.tid2name(tid)).to_string();
            let length = header.target_len(tid).unwrap_or(0);
            catalogue.push(name, length)?;
        }
        Ok(catalogue)
    }

    /// Length of a contig
    pub fn length(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).map(|&i| self.contigs[i].1)
    }

    /// Position of a contig in reference order
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Contigs in reference order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.contigs.iter().map(|(n, l)| (n.as_str(), *l))
    }

    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    /// Sum of all contig lengths
    pub fn total_length(&self) -> u64 {
        self.contigs.iter().map(|(_, l)| *l).sum()
    }
}

/// Detect compression format from file extension and/or magic bytes
pub fn detect_compression(path: &Path) -> CatalogueResult<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if extension == "gz" {
        return Ok(CompressionFormat::Gzip);
    }
    if extension == "bz2" {
        return Ok(CompressionFormat::Bzip2);
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(CompressionFormat::Gzip);
    }
    // BZ2 magic: "BZh"
    if bytes_read >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
        return Ok(CompressionFormat::Bzip2);
    }

    Ok(CompressionFormat::Plain)
}
