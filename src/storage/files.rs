//! File naming
//!
//! Every memtable generation owns `{generation:05}.wal` while it is live and
//! `{generation:05}.sst` once flushed. Sorted files are written under a
//! `.sst.tmp` name and renamed into place when complete.

use std::path::Path;

use crate::error::Result;

/// Kinds of files found in a store directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Wal,
    Sorted,
    SortedTemp,
}

pub fn wal_file_name(generation: u32) -> String {
    format!("{:05}.wal", generation)
}

pub fn sorted_file_name(generation: u32) -> String {
    format!("{:05}.sst", generation)
}

pub fn sorted_temp_file_name(generation: u32) -> String {
    format!("{:05}.sst.tmp", generation)
}

/// Parse generation and kind from a filename
/// "00042.wal" → Some((42, Wal))
pub fn parse_generation(path: &Path) -> Option<(u32, FileKind)> {
    let name = path.file_name()?.to_str()?;
    let (stem, kind) = if let Some(stem) = name.strip_suffix(".sst.tmp") {
        (stem, FileKind::SortedTemp)
    } else if let Some(stem) = name.strip_suffix(".sst") {
        (stem, FileKind::Sorted)
    } else if let Some(stem) = name.strip_suffix(".wal") {
        (stem, FileKind::Wal)
    } else {
        return None;
    };

    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok().map(|generation| (generation, kind))
}

/// Persist directory entries (creations, renames, removals)
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
