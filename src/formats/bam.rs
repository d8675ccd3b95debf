//! BAM/SAM/CRAM input adapter
//!
//! Scans an alignment file and feeds every record through the read cache.
//! Uses rust-htslib for reading. Indexed inputs are scanned one contig per
//! task on a rayon pool; unindexed inputs are read sequentially.

use crate::core::dna::{revcomp_in_place, reverse_qualities};
use crate::core::{
    CacheConfig, CacheError, CatalogueError, ContigCatalogue, ReadCache, ReadFlags, ReadSink,
    SequencingRead,
};
use crate::formats::fastq::{FastqOutputs, FastqSink};
use log::{debug, info};
use rayon::prelude::*;
use rust_htslib::bam::{self, FetchDefinition, HeaderView, Read, Record};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// BAM conversion error
#[derive(Debug, Error)]
pub enum BamError {
    #[error("HTSlib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("Invalid BAM header: {0}")]
    Header(#[from] CatalogueError),

    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),
}

/// Conversion statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Records read from the input
    pub total: u64,
    /// Records without the paired flag, written straight to singletons
    pub unpaired: u64,
    /// Secondary/supplementary records left out
    pub skipped: u64,
    /// Pairs written to R1/R2
    pub pairs: u64,
    /// Reads written alone
    pub singletons: u64,
    /// Most reads buffered at once
    pub peak_buffered: u64,
}

/// One unit of parallel scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanTask {
    Contig(u32),
    Unmapped,
}

#[derive(Debug, Default)]
struct ScanCounters {
    total: AtomicU64,
    unpaired: AtomicU64,
    skipped: AtomicU64,
}

fn get_chrom_name(header: &HeaderView, tid: i32) -> Option<String> {
    if tid < 0 {
        return None;
    }
    Some(String::from_utf8_lossy(header.tid2name(tid as u32)).to_string())
}

fn one_based(pos: i64) -> Option<u64> {
    (pos >= 0).then(|| pos as u64 + 1)
}

/// Convert an alignment record into a read in sequencing orientation
pub fn record_to_read(record: &Record, header: &HeaderView) -> SequencingRead {
    let mut sequence = record.seq().as_bytes();
    let qualities = if record.is_reverse() {
        revcomp_in_place(&mut sequence);
        reverse_qualities(record.qual())
    } else {
        record.qual().to_vec()
    };

    SequencingRead {
        name: record.qname().to_vec(),
        sequence,
        qualities,
        contig: get_chrom_name(header, record.tid()),
        position: one_based(record.pos()),
        mate_contig: get_chrom_name(header, record.mtid()),
        mate_position: one_based(record.mpos()),
        flags: ReadFlags::from_sam(record.flags()),
    }
}

fn feed_records<R: Read, S: ReadSink>(
    reader: &mut R,
    cache: &ReadCache<S>,
    counters: &ScanCounters,
) -> Result<(), BamError> {
    let header = reader.header().clone();
    let mut record = Record::new();

    while let Some(result) = reader.read(&mut record) {
        result?;
        counters.total.fetch_add(1, Ordering::Relaxed);

        let read = record_to_read(&record, &header);
        if read.flags.paired {
            cache.add(read)?;
        } else if read.flags.is_secondary_or_supplementary() {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.unpaired.fetch_add(1, Ordering::Relaxed);
            cache.sink().write_singleton(&read)?;
        }
    }
    Ok(())
}

fn scan_task<S: ReadSink>(
    input: &Path,
    task: ScanTask,
    cache: &ReadCache<S>,
    counters: &ScanCounters,
) -> Result<(), BamError> {
    let mut reader = bam::IndexedReader::from_path(input)?;
    match task {
        ScanTask::Contig(tid) => reader.fetch(FetchDefinition::CompleteTid(tid as i32))?,
        ScanTask::Unmapped => reader.fetch(FetchDefinition::Unmapped)?,
    }
    debug!("Scanning {:?}", task);
    feed_records(&mut reader, cache, counters)
}

/// Convert a coordinate-sorted BAM/SAM/CRAM file into paired FASTQ
pub fn convert_bam<P: AsRef<Path>>(
    input: P,
    outputs: &FastqOutputs,
    config: CacheConfig,
    threads: usize,
) -> Result<ConversionStats, BamError> {
    let input = input.as_ref();
    let threads = threads.max(1);

    let header = bam::Reader::from_path(input)?.header().clone();
    let catalogue = ContigCatalogue::from_header(&header)?;
    info!(
        "Reference: {} contigs, {} bp",
        catalogue.len(),
        catalogue.total_length()
    );

    let sink = FastqSink::create(outputs)?;
    let mut cache = ReadCache::new(&catalogue, config, sink)?;
    let counters = ScanCounters::default();

    let indexed = bam::IndexedReader::from_path(input).is_ok();
    if indexed && threads > 1 {
        info!("Scanning {} contigs with {} threads", catalogue.len(), threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| BamError::ThreadPool(e.to_string()))?;

        let mut tasks: Vec<ScanTask> = (0..header.target_count()).map(ScanTask::Contig).collect();
        tasks.push(ScanTask::Unmapped);

        pool.install(|| {
            tasks
                .par_iter()
                .try_for_each(|&task| scan_task(input, task, &cache, &counters))
        })?;
    } else {
        if threads > 1 {
            info!("Input has no index, scanning sequentially");
        }
        let mut reader = bam::Reader::from_path(input)?;
        reader.set_threads(threads)?;
        feed_records(&mut reader, &cache, &counters)?;
    }

    cache.flush()?;
    cache.log_stats();
    let cache_stats = cache.stats();
    let counts = cache.into_sink().finish()?;

    Ok(ConversionStats {
        total: counters.total.load(Ordering::Relaxed),
        unpaired: counters.unpaired.load(Ordering::Relaxed),
        skipped: counters.skipped.load(Ordering::Relaxed) + cache_stats.reads_skipped,
        pairs: counts.r1,
        singletons: counts.singletons,
        peak_buffered: cache_stats.peak_buffered,
    })
}
