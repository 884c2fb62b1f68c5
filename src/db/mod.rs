//! Database Module
//!
//! The coordinator that owns the memtable slots and serves reads and writes.
//!
//! ## Responsibilities
//! - Open a store directory: manifest check, WAL recovery
//! - Route puts to the active memtable
//! - Serve gets from the active memtable, then the retiring one
//! - Rotate full memtables in the background and flush them to sorted files
//! - Shut down cleanly, flushing the active memtable
//!
//! ## Concurrency Model
//!
//! - **Slots** (`active`, `retiring`, generation counter): one `RwLock`
//!   - `put`/`get` take the read lock; many writers proceed at once because
//!     they mutate memtable contents, not the slots
//!   - only a rotation swap or clearing the retiring slot takes the write lock
//! - **Memtable contents**: sharded maps inside each memtable, independent of
//!   the slot lock
//! - **Rotations**: serialized by `rotation_lock`; flushing runs without any
//!   slot lock held
//!
//! Sorted files are written but not read back: a key is visible until the
//! generation holding it has been flushed.

mod manifest;
mod recovery;
mod rotation;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::memtable::Memtable;
use crate::storage::SSTable;
use crate::task::PeriodicTask;
use crate::value::Value;

pub use manifest::{Manifest, MANIFEST_FILE};

/// Store health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,

    /// A flush failed; the generation is still served from memory and the
    /// flush is retried on every monitor tick
    Degraded { generation: u32 },
}

/// Which memtables are live
struct Slots {
    /// Accepts all writes
    active: Arc<Memtable>,

    /// Rotated out, being flushed; still readable
    retiring: Option<Arc<Memtable>>,

    /// Highest generation allocated so far
    generation: u32,
}

pub(crate) struct DbInner {
    config: Config,
    dir: PathBuf,
    slots: RwLock<Slots>,
    rotation_lock: Mutex<()>,
    health: Mutex<Health>,
    rotations: AtomicU64,
}

/// An open store
pub struct Db {
    inner: Arc<DbInner>,
    monitor: Option<PeriodicTask>,
}

impl Db {
    /// Open a store in an existing directory with default settings
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(Config::builder().data_dir(dir.as_ref()).build())
    }

    /// Open or initialize a store rooted at `config.data_dir`
    ///
    /// On startup:
    /// 1. Verify the directory exists (nothing is created otherwise)
    /// 2. Load or write the manifest
    /// 3. Recover WALs left by a previous run
    /// 4. Start the rotation monitor
    pub fn open_with(config: Config) -> Result<Self> {
        config.validate()?;
        let dir = config.data_dir.clone();

        // Step 1: the directory must already exist and be readable
        if !dir.is_dir() {
            return Err(DriftError::Initialization(format!(
                "store directory {} does not exist",
                dir.display()
            )));
        }
        std::fs::read_dir(&dir).map_err(|e| {
            DriftError::Initialization(format!("cannot read {}: {}", dir.display(), e))
        })?;

        // Step 2: persisted options
        Manifest::load_or_create(&dir, config.fingerprint)?;

        // Step 3: replay what a previous run left behind
        let recovered = recovery::recover(&dir, &config)?;
        let mut generation = recovered.last_generation;
        let active = match recovered.active {
            Some(memtable) => memtable,
            None => {
                generation += 1;
                Memtable::create(&dir, generation, &config)?
            }
        };

        tracing::info!(
            dir = %dir.display(),
            active = active.generation(),
            recovered_records = active.record_count(),
            flushed = recovered.flushed,
            "store opened"
        );

        let inner = Arc::new(DbInner {
            slots: RwLock::new(Slots {
                active: Arc::new(active),
                retiring: None,
                generation,
            }),
            rotation_lock: Mutex::new(()),
            health: Mutex::new(Health::Healthy),
            rotations: AtomicU64::new(0),
            config,
            dir,
        });

        // Step 4: background rotation
        let monitor = rotation::spawn_monitor(Arc::clone(&inner))?;

        Ok(Self {
            inner,
            monitor: Some(monitor),
        })
    }

    /// Write a key-value pair into the active memtable
    pub fn put(&self, key: impl Into<String>, value: Value) -> Result<()> {
        let slots = self.inner.slots.read();
        slots.active.set(key, value)
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. Active memtable
    /// 2. Retiring memtable, while it is being flushed
    pub fn get(&self, key: &str) -> Option<Value> {
        let slots = self.inner.slots.read();
        slots
            .active
            .get(key)
            .or_else(|| slots.retiring.as_ref().and_then(|retiring| retiring.get(key)))
    }

    /// Like [`Db::get`], with a missing key reported as `KeyNotFound`
    pub fn fetch(&self, key: &str) -> Result<Value> {
        self.get(key).ok_or(DriftError::KeyNotFound)
    }

    /// Rotate and flush the active memtable now, regardless of its size
    ///
    /// Returns `None` if the active memtable is empty.
    pub fn rotate(&self) -> Result<Option<SSTable>> {
        self.inner.rotate(true)
    }

    /// Close the store gracefully
    ///
    /// Stops the rotation monitor, finishes any pending flush and flushes the
    /// active memtable. An empty active memtable only has its WAL removed.
    pub fn close(mut self) -> Result<()> {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }

        let inner = &self.inner;
        let _rotation = inner.rotation_lock.lock();

        let pending = inner.slots.read().retiring.clone();
        if let Some(pending) = pending {
            inner.complete_retirement(&pending)?;
        }

        let active = Arc::clone(&inner.slots.read().active);
        if active.is_empty() {
            active.discard()?;
        } else {
            active.finalize()?;
        }

        tracing::info!(dir = %inner.dir.display(), "store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn health(&self) -> Health {
        *self.inner.health.lock()
    }

    /// Highest generation allocated so far
    pub fn generation(&self) -> u32 {
        self.inner.slots.read().generation
    }

    /// Generation of the memtable accepting writes
    pub fn active_generation(&self) -> u32 {
        self.inner.slots.read().active.generation()
    }

    /// Generation currently being flushed, if any
    pub fn retiring_generation(&self) -> Option<u32> {
        self.inner
            .slots
            .read()
            .retiring
            .as_ref()
            .map(|memtable| memtable.generation())
    }

    /// Accepted writes in the active memtable
    pub fn active_record_count(&self) -> u64 {
        self.inner.slots.read().active.record_count()
    }

    /// Rotations performed since open
    pub fn rotation_count(&self) -> u64 {
        self.inner.rotations.load(Ordering::Relaxed)
    }
}

impl Drop for Db {
    /// Stops the monitor without flushing; the WALs are replayed on next open
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("dir", &self.inner.dir)
            .field("generation", &self.generation())
            .field("health", &self.health())
            .finish()
    }
}
