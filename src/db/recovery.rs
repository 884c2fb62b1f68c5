//! Startup recovery
//!
//! Brings a store directory back to a consistent state before serving:
//! - stray `.sst.tmp` files (interrupted flushes) are removed
//! - a WAL whose `.sst` already exists was flushed but not deleted; delete it
//! - every other WAL except the newest is replayed and flushed
//! - the newest WAL is replayed into the memtable that becomes active

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::memtable::Memtable;
use crate::storage::{parse_generation, sync_dir, wal_file_name, FileKind};

/// Outcome of scanning a store directory
pub(crate) struct Recovered {
    /// Memtable rebuilt from the newest WAL, if one survived
    pub active: Option<Memtable>,

    /// Highest generation number found on disk (0 for an empty store)
    pub last_generation: u32,

    /// Older generations flushed during recovery
    pub flushed: usize,
}

pub(crate) fn recover(dir: &Path, config: &Config) -> Result<Recovered> {
    let mut wals = BTreeSet::new();
    let mut sorted = BTreeSet::new();
    let mut last_generation = 0;
    let mut removed = false;

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some((generation, kind)) = parse_generation(&path) else {
            continue;
        };
        last_generation = last_generation.max(generation);

        match kind {
            FileKind::Wal => {
                wals.insert(generation);
            }
            FileKind::Sorted => {
                sorted.insert(generation);
            }
            FileKind::SortedTemp => {
                tracing::warn!(path = %path.display(), "removing incomplete sorted file");
                remove_if_present(&path)?;
                removed = true;
            }
        }
    }

    // The sorted file is only renamed into place once complete, so its WAL is redundant
    for generation in wals.intersection(&sorted) {
        let path = dir.join(wal_file_name(*generation));
        tracing::info!(generation, "removing WAL of already flushed generation");
        remove_if_present(&path)?;
        removed = true;
    }
    wals.retain(|generation| !sorted.contains(generation));

    if removed {
        sync_dir(dir)?;
    }

    let newest = wals.pop_last();

    let mut flushed = 0;
    for generation in wals {
        let (memtable, _) = Memtable::recover(dir, generation, config)?;
        if memtable.is_empty() {
            memtable.discard()?;
        } else {
            memtable.finalize()?;
            flushed += 1;
        }
    }

    let active = match newest {
        Some(generation) => Some(Memtable::recover(dir, generation, config)?.0),
        None => None,
    };

    Ok(Recovered {
        active,
        last_generation,
        flushed,
    })
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
