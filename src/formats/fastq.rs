//! FASTQ output sink
//!
//! Writes completed pairs to an R1/R2 file pair and singletons to a third
//! file. Output paths ending in `.gz` are gzip compressed.

use crate::core::{ReadSink, SequencingRead};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Buffer size for each FASTQ output (128KB)
pub const OUTPUT_BUFFER_SIZE: usize = 128 * 1024;

/// Quality character written when a record carries no qualities
pub const MISSING_QUALITY: u8 = b'!';

/// Output locations for a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqOutputs {
    pub r1: PathBuf,
    pub r2: PathBuf,
    /// Singletons are counted but dropped when unset
    pub singletons: Option<PathBuf>,
}

/// Number of records written to each output
///
/// `singletons` counts reads accepted by the sink, including those dropped
/// because no singleton output was configured. Failed writes are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastqCounts {
    pub r1: u64,
    pub r2: u64,
    pub singletons: u64,
}

/// A plain or gzip-compressed output stream
pub enum OutputStream {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputStream {
    /// Create a file, compressing when the name ends in `.gz`
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, File::create(path)?);
        let gzip = path.extension().and_then(|e| e.to_str()) == Some("gz");
        Ok(if gzip {
            OutputStream::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            OutputStream::Plain(file)
        })
    }

    /// Flush buffers and write the gzip trailer
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputStream::Plain(mut w) => w.flush(),
            OutputStream::Gzip(w) => w.finish()?.flush(),
        }
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::Plain(w) => w.write(buf),
            OutputStream::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::Plain(w) => w.flush(),
            OutputStream::Gzip(w) => w.flush(),
        }
    }
}

/// Write one FASTQ record
///
/// `mate` appends `/1` or `/2` to the name. Qualities are raw Phred scores
/// and are shifted to Phred+33.
pub fn write_record<W: Write>(out: &mut W, read: &SequencingRead, mate: Option<u8>) -> io::Result<()> {
    out.write_all(b"@")?;
    out.write_all(&read.name)?;
    if let Some(mate) = mate {
        out.write_all(&[b'/', b'0' + mate])?;
    }
    out.write_all(b"\n")?;
    out.write_all(&read.sequence)?;
    out.write_all(b"\n+\n")?;

    let has_quals = read.qualities.len() == read.sequence.len()
        && read.qualities.first().map_or(true, |&q| q != 0xff);
    if has_quals {
        let encoded: Vec<u8> = read
            .qualities
            .iter()
            .map(|&q| q.saturating_add(33).min(b'~'))
            .collect();
        out.write_all(&encoded)?;
    } else {
        out.write_all(&vec![MISSING_QUALITY; read.sequence.len()])?;
    }
    out.write_all(b"\n")
}

/// [`ReadSink`] writing FASTQ files
///
/// R1 and R2 are locked together, R1 first, so both files receive pairs in
/// the same order.
pub struct FastqSink {
    r1: Mutex<OutputStream>,
    r2: Mutex<OutputStream>,
    singletons: Option<Mutex<OutputStream>>,
    r1_count: AtomicU64,
    r2_count: AtomicU64,
    singleton_count: AtomicU64,
}

impl FastqSink {
    /// Create the output files
    pub fn create(outputs: &FastqOutputs) -> io::Result<Self> {
        let singletons = match &outputs.singletons {
            Some(path) => Some(OutputStream::create(path)?),
            None => None,
        };
        Ok(Self::from_streams(
            OutputStream::create(&outputs.r1)?,
            OutputStream::create(&outputs.r2)?,
            singletons,
        ))
    }

    pub fn from_streams(r1: OutputStream, r2: OutputStream, singletons: Option<OutputStream>) -> Self {
        Self {
            r1: Mutex::new(r1),
            r2: Mutex::new(r2),
            singletons: singletons.map(Mutex::new),
            r1_count: AtomicU64::new(0),
            r2_count: AtomicU64::new(0),
            singleton_count: AtomicU64::new(0),
        }
    }

    pub fn counts(&self) -> FastqCounts {
        FastqCounts {
            r1: self.r1_count.load(Ordering::Relaxed),
            r2: self.r2_count.load(Ordering::Relaxed),
            singletons: self.singleton_count.load(Ordering::Relaxed),
        }
    }

    /// Flush and close every output
    pub fn finish(self) -> io::Result<FastqCounts> {
        let counts = self.counts();
        self.r1.into_inner().finish()?;
        self.r2.into_inner().finish()?;
        if let Some(singletons) = self.singletons {
            singletons.into_inner().finish()?;
        }
        Ok(counts)
    }
}

impl ReadSink for FastqSink {
    fn write_pair(&self, first: &SequencingRead, second: &SequencingRead) -> io::Result<()> {
        let mut r1 = self.r1.lock();
        let mut r2 = self.r2.lock();
        write_record(&mut *r1, first, Some(1))?;
        write_record(&mut *r2, second, Some(2))?;
        self.r1_count.fetch_add(1, Ordering::Relaxed);
        self.r2_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_singleton(&self, read: &SequencingRead) -> io::Result<()> {
        if let Some(out) = &self.singletons {
            let mate = if !read.flags.paired {
                None
            } else if read.flags.first_of_pair {
                Some(1)
            } else {
                Some(2)
            };
            write_record(&mut *out.lock(), read, mate)?;
        }
        self.singleton_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ReadFlags;
    use std::io::Read;
    use tempfile::tempdir;

    fn read(name: &str, first: bool) -> SequencingRead {
        SequencingRead::new(name, first).with_bases(b"ACGT".to_vec(), vec![30, 30, 20, 10])
    }

    #[test]
    fn test_write_record() {
        let mut out = Vec::new();
        write_record(&mut out, &read("r1", true), Some(1)).unwrap();
        assert_eq!(out, b"@r1/1\nACGT\n+\n??5+\n");
    }

    #[test]
    fn test_write_record_missing_qualities() {
        let mut out = Vec::new();
        let r = SequencingRead::new("r", true).with_bases(b"ACG".to_vec(), vec![0xff, 0xff, 0xff]);
        write_record(&mut out, &r, None).unwrap();
        assert_eq!(out, b"@r\nACG\n+\n!!!\n");
    }

    #[test]
    fn test_fastq_sink_files() -> io::Result<()> {
        let dir = tempdir()?;
        let outputs = FastqOutputs {
            r1: dir.path().join("out_R1.fastq"),
            r2: dir.path().join("out_R2.fastq"),
            singletons: Some(dir.path().join("out_single.fastq")),
        };

        let sink = FastqSink::create(&outputs)?;
        sink.write_pair(&read("a", true), &read("a", false))?;
        sink.write_singleton(&read("b", false))?;
        let unpaired = read("c", true).with_flags(ReadFlags::default());
        sink.write_singleton(&unpaired)?;
        let counts = sink.finish()?;

        assert_eq!(counts, FastqCounts { r1: 1, r2: 1, singletons: 2 });
        assert_eq!(std::fs::read_to_string(&outputs.r1)?, "@a/1\nACGT\n+\n??5+\n");
        assert_eq!(std::fs::read_to_string(&outputs.r2)?, "@a/2\nACGT\n+\n??5+\n");
        let singles = std::fs::read_to_string(outputs.singletons.as_ref().unwrap())?;
        assert!(singles.starts_with("@b/2\n"));
        assert!(singles.contains("@c\n"));
        Ok(())
    }

    #[test]
    fn test_fastq_sink_gzip() -> io::Result<()> {
        let dir = tempdir()?;
        let outputs = FastqOutputs {
            r1: dir.path().join("R1.fastq.gz"),
            r2: dir.path().join("R2.fastq.gz"),
            singletons: None,
        };

        let sink = FastqSink::create(&outputs)?;
        sink.write_pair(&read("a", true), &read("a", false))?;
        sink.write_singleton(&read("lost", true))?;
        let counts = sink.finish()?;
        assert_eq!(counts.singletons, 1);

        let mut text = String::new();
        flate2::read::GzDecoder::new(File::open(&outputs.r1)?).read_to_string(&mut text)?;
        assert_eq!(text, "@a/1\nACGT\n+\n??5+\n");
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_singleton_write_is_not_counted() -> io::Result<()> {
        let dir = tempdir()?;
        let full = std::fs::OpenOptions::new().write(true).open("/dev/full")?;
        let sink = FastqSink::from_streams(
            OutputStream::create(dir.path().join("R1.fastq"))?,
            OutputStream::create(dir.path().join("R2.fastq"))?,
            Some(OutputStream::Plain(BufWriter::with_capacity(0, full))),
        );

        assert!(sink.write_singleton(&read("x", true)).is_err());
        assert_eq!(sink.counts().singletons, 0);
        Ok(())
    }

    #[test]
    fn test_singletons_counted_without_output() -> io::Result<()> {
        let dir = tempdir()?;
        let sink = FastqSink::from_streams(
            OutputStream::create(dir.path().join("R1.fastq"))?,
            OutputStream::create(dir.path().join("R2.fastq"))?,
            None,
        );
        sink.write_singleton(&read("x", true))?;
        assert_eq!(sink.counts().singletons, 1);
        Ok(())
    }
}
