//! Configuration for driftkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DriftError, Result};
use crate::fingerprint::FingerprintKind;

/// Main configuration for a driftkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files. Must already exist.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── MANIFEST         (persisted store options)
    ///     ├── 00001.wal        (write-ahead log, one per generation)
    ///     └── 00001.sst        (sorted file, one per flushed generation)
    pub data_dir: PathBuf,

    /// Write buffer size used when producing a sorted file
    pub sorted_file_buffer_size: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// How often the background task fsyncs the active WAL
    pub wal_sync_interval: Duration,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Record count above which the active memtable is rotated
    pub rotation_threshold: u64,

    /// How often the rotation monitor inspects the active memtable
    pub rotation_check_interval: Duration,

    /// In-memory layout of each memtable
    pub memtable_backend: MemtableBackend,

    /// Key fingerprint used by the bucketed backend. Persisted on first open;
    /// a store cannot be reopened with a different fingerprint.
    pub fingerprint: FingerprintKind,

    // -------------------------------------------------------------------------
    // External Sort Configuration
    // -------------------------------------------------------------------------
    /// Buffered bytes before the sorter spills a run to disk
    pub sort_memory_budget: usize,

    /// Directory for spill files (`None` uses the system temp dir)
    pub sort_spill_dir: Option<PathBuf>,

    /// Keep only the last value written per key while sorting
    pub sort_dedupe: bool,
}

/// Memtable layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemtableBackend {
    /// One flat concurrent map of key → value
    Flat,

    /// Keys grouped into ordered buckets by fingerprint
    Bucketed,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./driftkv_data"),
            sorted_file_buffer_size: 8 * 4096,
            wal_sync_interval: Duration::from_secs(1),
            rotation_threshold: 300_000,
            rotation_check_interval: Duration::from_secs(1),
            memtable_backend: MemtableBackend::Flat,
            fingerprint: FingerprintKind::Xxh64,
            sort_memory_budget: 64 * 1024 * 1024, // 64 MB
            sort_spill_dir: None,
            sort_dedupe: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings that would stall the background tasks
    pub fn validate(&self) -> Result<()> {
        if self.rotation_threshold == 0 {
            return Err(DriftError::Config(
                "rotation_threshold must be greater than zero".to_string(),
            ));
        }
        if self.rotation_check_interval.is_zero() {
            return Err(DriftError::Config(
                "rotation_check_interval must be non-zero".to_string(),
            ));
        }
        if self.wal_sync_interval.is_zero() {
            return Err(DriftError::Config(
                "wal_sync_interval must be non-zero".to_string(),
            ));
        }
        if self.sort_memory_budget == 0 {
            return Err(DriftError::Config(
                "sort_memory_budget must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the record count that triggers a rotation
    pub fn rotation_threshold(mut self, records: u64) -> Self {
        self.config.rotation_threshold = records;
        self
    }

    /// Set how often the rotation monitor runs
    pub fn rotation_check_interval(mut self, interval: Duration) -> Self {
        self.config.rotation_check_interval = interval;
        self
    }

    /// Set how often the WAL is fsynced in the background
    pub fn wal_sync_interval(mut self, interval: Duration) -> Self {
        self.config.wal_sync_interval = interval;
        self
    }

    /// Set the memtable layout
    pub fn memtable_backend(mut self, backend: MemtableBackend) -> Self {
        self.config.memtable_backend = backend;
        self
    }

    /// Set the key fingerprint
    pub fn fingerprint(mut self, kind: FingerprintKind) -> Self {
        self.config.fingerprint = kind;
        self
    }

    /// Set the external sort memory budget (in bytes)
    pub fn sort_memory_budget(mut self, bytes: usize) -> Self {
        self.config.sort_memory_budget = bytes;
        self
    }

    /// Set the directory used for sort spill files
    pub fn sort_spill_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sort_spill_dir = Some(path.into());
        self
    }

    /// Enable or disable per-key deduplication during sort
    pub fn sort_dedupe(mut self, dedupe: bool) -> Self {
        self.config.sort_dedupe = dedupe;
        self
    }

    /// Set the sorted-file write buffer size (in bytes)
    pub fn sorted_file_buffer_size(mut self, bytes: usize) -> Self {
        self.config.sorted_file_buffer_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
