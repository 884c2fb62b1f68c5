//! Memtable generation
//!
//! One memtable = one generation number, one WAL file, one table, one
//! background sync task.
//!
//! ## Lifecycle
//! ```text
//! create/recover ──► active (set/get) ──► retired by the coordinator ──► finalize
//!                                                                          │
//!          {gen}.wal deleted ◄── {gen}.sst renamed into place ◄── sort ◄───┘
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::sort::{ExternalSorter, SortOptions};
use crate::storage::{
    sorted_file_name, sorted_temp_file_name, sync_dir, wal_file_name, SSTable, SSTableBuilder,
};
use crate::task::PeriodicTask;
use crate::value::{Entry, Value};
use crate::wal::{RecoveryResult, WalRecovery, WalWriter};

use super::sync::spawn_wal_sync;
use super::{build_table, Table};

/// In-memory table for one generation, backed by its WAL
pub struct Memtable {
    generation: u32,

    /// Directory holding the WAL and, after finalize, the sorted file
    dir: PathBuf,

    wal_path: PathBuf,

    /// `None` once the WAL has been closed by finalize
    wal: Arc<Mutex<Option<WalWriter>>>,

    table: Box<dyn Table>,

    /// Accepted `set` calls (approximate rotation signal)
    record_count: AtomicU64,

    sync_task: Mutex<Option<PeriodicTask>>,

    finalized: AtomicBool,

    sort_options: SortOptions,

    sorted_file_buffer_size: usize,
}

impl Memtable {
    /// Create an empty memtable with a fresh `{generation}.wal`
    ///
    /// Fails if that WAL already exists; generations are never reused.
    pub fn create(dir: &Path, generation: u32, config: &Config) -> Result<Self> {
        let wal_path = dir.join(wal_file_name(generation));
        let writer = WalWriter::create(&wal_path)?;

        tracing::debug!(generation, path = %wal_path.display(), "created memtable");
        Self::assemble(dir, generation, writer, build_table(config), 0, config)
    }

    /// Rebuild a memtable from an existing `{generation}.wal`
    ///
    /// Intact records are replayed in log order, a torn tail is truncated, and
    /// new writes are appended after the last intact record.
    pub fn recover(dir: &Path, generation: u32, config: &Config) -> Result<(Self, RecoveryResult)> {
        let wal_path = dir.join(wal_file_name(generation));
        let (records, result) = WalRecovery::recover(&wal_path)?;

        let table = build_table(config);
        for record in records {
            table.insert(record.entry.key, record.entry.value);
        }

        let writer = WalWriter::open_append(&wal_path, result.valid_len, result.last_lsn + 1)?;
        let memtable = Self::assemble(
            dir,
            generation,
            writer,
            table,
            result.entries_recovered,
            config,
        )?;

        tracing::info!(
            generation,
            entries = result.entries_recovered,
            keys = memtable.len(),
            truncated = result.was_truncated,
            "replayed WAL"
        );
        Ok((memtable, result))
    }

    fn assemble(
        dir: &Path,
        generation: u32,
        writer: WalWriter,
        table: Box<dyn Table>,
        record_count: u64,
        config: &Config,
    ) -> Result<Self> {
        let wal_path = writer.path().to_path_buf();
        let wal = Arc::new(Mutex::new(Some(writer)));
        let sync_task = spawn_wal_sync(generation, Arc::clone(&wal), config.wal_sync_interval)?;

        Ok(Self {
            generation,
            dir: dir.to_path_buf(),
            wal_path,
            wal,
            table,
            record_count: AtomicU64::new(record_count),
            sync_task: Mutex::new(Some(sync_task)),
            finalized: AtomicBool::new(false),
            sort_options: SortOptions {
                memory_budget: config.sort_memory_budget,
                spill_dir: config.sort_spill_dir.clone(),
                dedupe: config.sort_dedupe,
            },
            sorted_file_buffer_size: config.sorted_file_buffer_size,
        })
    }

    /// Log the write, then apply it to the table
    ///
    /// If the WAL append fails nothing is applied. The table update happens
    /// under the WAL lock, so in-memory state always matches log order.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let entry = Entry::new(key, value);

        let mut wal = self.wal.lock();
        let writer = wal.as_mut().ok_or(DriftError::Closed)?;
        writer.append(&entry)?;

        self.table.insert(entry.key, entry.value);
        self.record_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Look up a key in this generation only
    pub fn get(&self, key: &str) -> Option<Value> {
        self.table.get(key)
    }

    /// Number of accepted writes (never decreases)
    pub fn record_count(&self) -> u64 {
        self.record_count.load(Ordering::Relaxed)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    pub fn sorted_file_path(&self) -> PathBuf {
        self.dir.join(sorted_file_name(self.generation))
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Flush this generation to `{generation}.sst` and delete its WAL
    ///
    /// Must only be called once no more `set` calls can reach this memtable.
    /// Steps, in order:
    /// 1. Stop the background sync task
    /// 2. Sync and close the WAL
    /// 3. Drain the table through the external sorter
    /// 4. Write the sorted file under a temp name, sync it, rename it
    /// 5. Delete the WAL
    ///
    /// Each step tolerates having already run, so a failed finalize can be
    /// retried. The table is left intact, and keeps serving reads, until the
    /// memtable is dropped.
    pub fn finalize(&self) -> Result<SSTable> {
        if self.is_finalized() {
            return Err(DriftError::Storage(format!(
                "generation {} is already finalized",
                self.generation
            )));
        }

        if let Some(task) = self.sync_task.lock().take() {
            task.stop();
        }

        if let Some(writer) = self.wal.lock().take() {
            writer.close()?;
        }

        let sstable = self.write_sorted_file()?;

        match fs::remove_file(&self.wal_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        sync_dir(&self.dir)?;

        self.finalized.store(true, Ordering::Release);

        tracing::info!(
            generation = self.generation,
            records = sstable.entry_count,
            bytes = sstable.file_size,
            path = %sstable.path.display(),
            "memtable flushed"
        );
        Ok(sstable)
    }

    /// Close and delete the WAL of a memtable that never accepted a write
    pub fn discard(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(DriftError::Storage(format!(
                "generation {} holds {} keys and cannot be discarded",
                self.generation,
                self.len()
            )));
        }

        if let Some(task) = self.sync_task.lock().take() {
            task.stop();
        }
        if let Some(writer) = self.wal.lock().take() {
            writer.close()?;
        }
        match fs::remove_file(&self.wal_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.finalized.store(true, Ordering::Release);

        tracing::debug!(generation = self.generation, "discarded empty memtable");
        Ok(())
    }

    /// Write the table contents as a sorted file, then close the sorter
    fn write_sorted_file(&self) -> Result<SSTable> {
        let temp_path = self.dir.join(sorted_temp_file_name(self.generation));
        let final_path = self.sorted_file_path();

        let mut sorter = ExternalSorter::new(self.sort_options.clone());
        self.table
            .for_each(&mut |key, value| sorter.put(key.as_bytes(), &value.encode()?))?;

        let mut builder =
            SSTableBuilder::with_buffer_size(&temp_path, self.sorted_file_buffer_size)?;
        for pair in sorter.sort()? {
            let (key, value) = pair?;
            builder.add(&key, &value)?;
        }
        let mut sstable = builder.finish()?;

        let spilled = sorter.spilled_runs();
        sorter.close()?;

        fs::rename(&temp_path, &final_path)?;
        sync_dir(&self.dir)?;
        sstable.path = final_path;

        tracing::debug!(
            generation = self.generation,
            spilled_runs = spilled,
            "sorted file written"
        );
        Ok(sstable)
    }
}

impl std::fmt::Debug for Memtable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memtable")
            .field("generation", &self.generation)
            .field("records", &self.record_count())
            .field("keys", &self.len())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}
