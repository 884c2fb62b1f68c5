//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{DriftError, Result};

use super::{FileMetadata, SSTable, RECORD_HEADER_SIZE};

/// Default write buffer: 8 pages
const DEFAULT_BUFFER_SIZE: usize = 8 * 4096;

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer, so records never hit the disk one by one
    writer: BufWriter<File>,
    /// Number of entries written
    entry_count: u64,
    /// Current write position
    current_offset: u64,
    /// Track first/last keys for metadata
    start_key: Option<Vec<u8>>,
    last_key: Option<Vec<u8>>,
}

impl SSTableBuilder {
    /// Create a new SSTable builder, truncating any existing file at `path`
    ///
    /// Call `add()` in ascending key order, then `finish()` to write the
    /// metadata block and footer.
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(path: &Path, buffer_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(buffer_size.max(1), file),
            entry_count: 0,
            current_offset: 0,
            start_key: None,
            last_key: None,
        })
    }

    /// Add a key-value pair (must be called in non-decreasing key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key < last.as_slice() {
                return Err(DriftError::Storage(format!(
                    "SSTable keys out of order: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }

        let key_len = u32::try_from(key.len())
            .map_err(|_| DriftError::Storage(format!("key too large: {} bytes", key.len())))?;
        let val_len = u32::try_from(value.len()).map_err(|_| {
            DriftError::Storage(format!("value too large: {} bytes", value.len()))
        })?;

        // [key_len(4)][val_len(4)][key][value]
        self.writer.write_all(&key_len.to_le_bytes())?;
        self.writer.write_all(&val_len.to_le_bytes())?;
        self.writer.write_all(key)?;
        self.writer.write_all(value)?;

        if self.start_key.is_none() {
            self.start_key = Some(key.to_vec());
        }
        match &mut self.last_key {
            Some(last) => {
                last.clear();
                last.extend_from_slice(key);
            }
            None => self.last_key = Some(key.to_vec()),
        }

        self.current_offset += RECORD_HEADER_SIZE + key.len() as u64 + value.len() as u64;
        self.entry_count += 1;

        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Finish building: write metadata block and footer, flush, and sync
    pub fn finish(mut self) -> Result<SSTable> {
        let metadata_offset = self.current_offset;
        let metadata = FileMetadata {
            start_key: self.start_key.take().unwrap_or_default(),
            last_key: self.last_key.take().unwrap_or_default(),
        };

        let encoded = bincode::serialize(&metadata)?;
        self.writer.write_all(&encoded)?;

        let footer = i64::try_from(metadata_offset).map_err(|_| {
            DriftError::Storage(format!("metadata offset overflow: {}", metadata_offset))
        })?;
        self.writer.write_all(&footer.to_le_bytes())?;

        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| DriftError::Storage(format!("Failed to flush SSTable: {}", e)))?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();

        Ok(SSTable {
            path: self.path,
            entry_count: self.entry_count,
            min_key: metadata.start_key,
            max_key: metadata.last_key,
            metadata_offset,
            file_size,
        })
    }
}
