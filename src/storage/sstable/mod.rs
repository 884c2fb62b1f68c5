//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry, ascending by key ...     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Metadata Block (variable)                               │
//! │   bincode { start_key, last_key }                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                        │
//! │   MetadataOffset: i64                                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. A reader seeks to `len - 8`, reads the
//! metadata offset, then seeks there.

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

/// Footer size: MetadataOffset (8)
pub const FOOTER_SIZE: u64 = 8;

/// Record header size: KeyLen (4) + ValLen (4)
pub(crate) const RECORD_HEADER_SIZE: u64 = 8;

// =============================================================================
// Metadata
// =============================================================================

/// Metadata block stored before the footer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// First (smallest) key written, empty for an empty file
    pub start_key: Vec<u8>,
    /// Last (largest) key written, empty for an empty file
    pub last_key: Vec<u8>,
}

/// Summary of a finished SSTable
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of records in this SSTable
    pub entry_count: u64,
    /// Smallest key
    pub min_key: Vec<u8>,
    /// Largest key
    pub max_key: Vec<u8>,
    /// Byte offset of the metadata block
    pub metadata_offset: u64,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of records
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}
