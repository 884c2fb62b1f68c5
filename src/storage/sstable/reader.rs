//! SSTable Reader
//!
//! Opens SSTable files through their footer and exposes the metadata block.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{DriftError, Result};

use super::iterator::SSTableIterator;
use super::{FileMetadata, FOOTER_SIZE};

/// Reader for SSTable files
pub struct SSTableReader {
    path: PathBuf,
    /// File handle for reading records
    pub(super) file: BufReader<File>,
    /// Decoded metadata block
    metadata: FileMetadata,
    /// Metadata block starting offset (end of the data block)
    pub(super) metadata_offset: u64,
    file_size: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Reads the footer, validates the offset it points at and decodes the
    /// metadata block.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < FOOTER_SIZE {
            return Err(DriftError::Storage(format!(
                "SSTable too small: {} bytes",
                file_size
            )));
        }

        // Footer → metadata offset
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let raw_offset = i64::from_le_bytes(footer);

        let metadata_end = file_size - FOOTER_SIZE;
        let metadata_offset = u64::try_from(raw_offset)
            .ok()
            .filter(|offset| *offset < metadata_end)
            .ok_or_else(|| {
                DriftError::Storage(format!(
                    "Invalid SSTable footer: offset {} in a {} byte file",
                    raw_offset, file_size
                ))
            })?;

        // Metadata block lies between the offset and the footer
        file.seek(SeekFrom::Start(metadata_offset))?;
        let mut block = vec![0u8; (metadata_end - metadata_offset) as usize];
        file.read_exact(&mut block)?;
        let metadata: FileMetadata = bincode::deserialize(&block)
            .map_err(|e| DriftError::Storage(format!("Invalid SSTable metadata: {}", e)))?;

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            metadata,
            metadata_offset,
            file_size,
        })
    }

    /// Metadata block contents
    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Offset of the metadata block
    pub fn metadata_offset(&self) -> u64 {
        self.metadata_offset
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file holds no records
    pub fn is_empty(&self) -> bool {
        self.metadata_offset == 0
    }

    /// Create an iterator over all records, from the start of the file
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, self.metadata_offset)
    }
}
