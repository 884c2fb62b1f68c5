//! Storage Module
//!
//! Persistent storage layer: immutable sorted files produced by memtable
//! flushes, plus the file naming scheme shared with the WAL.
//!
//! ## Responsibilities
//! - Persist a sorted stream to disk with buffered writes
//! - Locate the metadata block of an existing file through its footer
//! - Sequential scans of a file's records
//!
//! Point lookups against sorted files, merging across files and compaction
//! are not provided; reads are served by the memtables only.

mod files;
mod sstable;

pub use files::{
    parse_generation, sorted_file_name, sorted_temp_file_name, sync_dir, wal_file_name, FileKind,
};
pub use sstable::{FileMetadata, SSTable, SSTableBuilder, SSTableIterator, SSTableReader, FOOTER_SIZE};
