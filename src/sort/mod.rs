//! External Sort Module
//!
//! Sorts a stream of key-value pairs that may not fit in memory.
//!
//! ## How it works
//! - `put` buffers pairs in memory
//! - Once the buffered bytes exceed the memory budget, the buffer is sorted
//!   and spilled to an anonymous temp file (a *run*)
//! - `sort` merges every run plus the in-memory tail with a k-way heap merge
//!   and yields pairs lazily in ascending key order
//!
//! The merge is stable: pairs with equal keys come out in the order they
//! were put. With `dedupe` enabled only the last pair put for a key is
//! yielded.

mod merge;
mod run;

use std::path::PathBuf;

use crate::error::Result;

pub use merge::SortedIter;
use run::SpillRun;

/// Per-pair bookkeeping charged against the memory budget
const PAIR_OVERHEAD: usize = 2 * std::mem::size_of::<Vec<u8>>();

/// Options for an [`ExternalSorter`]
#[derive(Debug, Clone)]
pub struct SortOptions {
    /// Buffered bytes before a run is spilled
    pub memory_budget: usize,

    /// Where spill files go (`None` uses the system temp dir)
    pub spill_dir: Option<PathBuf>,

    /// Yield only the last value put for each key
    pub dedupe: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            memory_budget: 64 * 1024 * 1024,
            spill_dir: None,
            dedupe: false,
        }
    }
}

/// Sorter that spills sorted runs to temporary storage
pub struct ExternalSorter {
    options: SortOptions,
    buffer: Vec<(Vec<u8>, Vec<u8>)>,
    buffered_bytes: usize,
    runs: Vec<SpillRun>,
    len: u64,
}

impl ExternalSorter {
    pub fn new(options: SortOptions) -> Self {
        Self {
            options,
            buffer: Vec::new(),
            buffered_bytes: 0,
            runs: Vec::new(),
            len: 0,
        }
    }

    /// Add a pair, spilling a run if the memory budget is exceeded
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.buffered_bytes += key.len() + value.len() + PAIR_OVERHEAD;
        self.buffer.push((key.to_vec(), value.to_vec()));
        self.len += 1;

        if self.buffered_bytes >= self.options.memory_budget {
            self.spill()?;
        }
        Ok(())
    }

    /// Sort the buffer and write it out as a run
    fn spill(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        // sort_by is stable, keeping insertion order for equal keys
        self.buffer.sort_by(|a, b| a.0.cmp(&b.0));
        let run = SpillRun::write(self.options.spill_dir.as_deref(), &self.buffer)?;

        tracing::debug!(
            run = self.runs.len(),
            records = run.len(),
            bytes = self.buffered_bytes,
            "spilled sort run"
        );

        self.runs.push(run);
        self.buffer.clear();
        self.buffered_bytes = 0;
        Ok(())
    }

    /// Merge everything put so far into one ascending stream
    ///
    /// Each call starts a fresh pass from the beginning.
    pub fn sort(&mut self) -> Result<SortedIter<'_>> {
        self.buffer.sort_by(|a, b| a.0.cmp(&b.0));

        let mut readers = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            readers.push(run.reader()?);
        }

        SortedIter::new(readers, &self.buffer, self.options.dedupe)
    }

    /// Total pairs put
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of runs spilled to disk so far
    pub fn spilled_runs(&self) -> usize {
        self.runs.len()
    }

    /// Release buffers and temporary files
    pub fn close(self) -> Result<()> {
        let runs = self.runs.len();
        drop(self.runs);
        if runs > 0 {
            tracing::debug!(runs, "released sort runs");
        }
        Ok(())
    }
}
