//! SSTable Iterator
//!
//! Sequential iteration over all records in an SSTable.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::error::{DriftError, Result};

use super::RECORD_HEADER_SIZE;

/// Iterator over SSTable records in sorted key order
pub struct SSTableIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Stop reading when we reach this offset (start of metadata block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
    failed: bool,
}

impl<'a> SSTableIterator<'a> {
    /// Create a new iterator starting from the first record
    pub(super) fn new(file: &'a mut BufReader<File>, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: 0,
            failed: false,
        })
    }

    fn read_record(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        self.file.read_exact(&mut header)?;

        let mut key_len = [0u8; 4];
        let mut val_len = [0u8; 4];
        key_len.copy_from_slice(&header[0..4]);
        val_len.copy_from_slice(&header[4..8]);
        let key_len = u32::from_le_bytes(key_len) as u64;
        let val_len = u32::from_le_bytes(val_len) as u64;

        let entry_size = RECORD_HEADER_SIZE + key_len + val_len;
        if self.current_offset + entry_size > self.end_offset {
            return Err(DriftError::Storage(format!(
                "record at offset {} overruns the data block",
                self.current_offset
            )));
        }

        let mut key = vec![0u8; key_len as usize];
        self.file.read_exact(&mut key)?;
        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;

        self.current_offset += entry_size;
        Ok((key, value))
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    /// (key, value) pairs
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        // Stop at the metadata block
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        let record = self.read_record();
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }
}
