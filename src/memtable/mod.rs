//! MemTable Module
//!
//! In-memory data structure for recent writes, one per generation.
//!
//! ## Responsibilities
//! - Log every write to the generation's WAL before it becomes visible
//! - Reads take only a shard lock; writes to one generation are
//!   serialized by its WAL lock so the table follows log order
//! - Count accepted writes as the rotation signal
//! - Periodically fsync the WAL in the background
//! - Convert itself into a sorted file at end of life
//!
//! ## Data Structure Choice
//! Two backends behind the [`Table`] trait:
//! - [`FlatTable`]: one sharded concurrent map (default)
//! - [`BucketedTable`]: keys grouped by fingerprint into small ordered buckets
//!
//! Neither keeps keys globally ordered; order is produced at flush time by
//! the external sorter.

mod bucketed;
mod generation;
mod sync;
mod table;

pub use bucketed::BucketedTable;
pub use generation::Memtable;
pub use table::{FlatTable, Table};

use crate::config::{Config, MemtableBackend};

/// Build the table backend selected by the config
pub fn build_table(config: &Config) -> Box<dyn Table> {
    match config.memtable_backend {
        MemtableBackend::Flat => Box::new(FlatTable::new()),
        MemtableBackend::Bucketed => Box::new(BucketedTable::new(config.fingerprint.build())),
    }
}
