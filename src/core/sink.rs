//! Downstream consumer of completed pairs and singletons

use crate::core::read::SequencingRead;
use parking_lot::Mutex;
use std::io;

/// Receives reads leaving the cache
///
/// Called from producer threads while a partition lock is held, so
/// implementations must be thread-safe and should not block for long.
/// Reads are lent, not handed over: a read whose write fails stays with
/// the cache.
pub trait ReadSink: Send + Sync {
    /// A completed pair; `first` is always the firstOfPair mate
    fn write_pair(&self, first: &SequencingRead, second: &SequencingRead) -> io::Result<()>;

    /// A read whose mate was never seen
    fn write_singleton(&self, read: &SequencingRead) -> io::Result<()>;
}

impl<S: ReadSink + ?Sized> ReadSink for &S {
    fn write_pair(&self, first: &SequencingRead, second: &SequencingRead) -> io::Result<()> {
        (**self).write_pair(first, second)
    }

    fn write_singleton(&self, read: &SequencingRead) -> io::Result<()> {
        (**self).write_singleton(read)
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct CollectingSink {
    pairs: Mutex<Vec<(SequencingRead, SequencingRead)>>,
    singletons: Mutex<Vec<SequencingRead>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairs(&self) -> Vec<(SequencingRead, SequencingRead)> {
        self.pairs.lock().clone()
    }

    pub fn singletons(&self) -> Vec<SequencingRead> {
        self.singletons.lock().clone()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.lock().len()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.lock().len()
    }
}

impl ReadSink for CollectingSink {
    fn write_pair(&self, first: &SequencingRead, second: &SequencingRead) -> io::Result<()> {
        self.pairs.lock().push((first.clone(), second.clone()));
        Ok(())
    }

    fn write_singleton(&self, read: &SequencingRead) -> io::Result<()> {
        self.singletons.lock().push(read.clone());
        Ok(())
    }
}
