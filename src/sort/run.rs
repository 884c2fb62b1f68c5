//! Spilled sort runs
//!
//! A run is an anonymous temp file of `[KeyLen: u32][ValLen: u32][Key][Value]`
//! records in ascending key order. The OS removes the file once the last
//! handle is dropped.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{DriftError, Result};

const RUN_BUFFER_SIZE: usize = 64 * 1024;

pub(super) struct SpillRun {
    file: File,
    len: u64,
}

impl SpillRun {
    /// Write already-sorted pairs to a fresh temp file
    pub fn write(dir: Option<&Path>, pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<Self> {
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };

        let mut writer = BufWriter::with_capacity(RUN_BUFFER_SIZE, file);
        for (key, value) in pairs {
            let key_len = u32::try_from(key.len())
                .map_err(|_| DriftError::Storage(format!("key too large: {} bytes", key.len())))?;
            let val_len = u32::try_from(value.len()).map_err(|_| {
                DriftError::Storage(format!("value too large: {} bytes", value.len()))
            })?;
            writer.write_all(&key_len.to_le_bytes())?;
            writer.write_all(&val_len.to_le_bytes())?;
            writer.write_all(key)?;
            writer.write_all(value)?;
        }
        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| DriftError::Storage(format!("Failed to flush sort run: {}", e)))?;

        Ok(Self {
            file,
            len: pairs.len() as u64,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    /// Open a reader positioned at the first record
    pub fn reader(&self) -> Result<RunReader> {
        let mut file = self.file.try_clone()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(RunReader {
            reader: BufReader::with_capacity(RUN_BUFFER_SIZE, file),
            remaining: self.len,
        })
    }
}

pub(super) struct RunReader {
    reader: BufReader<File>,
    remaining: u64,
}

impl RunReader {
    pub fn next_pair(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let mut header = [0u8; 8];
        self.reader.read_exact(&mut header)?;
        let mut key_len = [0u8; 4];
        let mut val_len = [0u8; 4];
        key_len.copy_from_slice(&header[0..4]);
        val_len.copy_from_slice(&header[4..8]);

        let mut key = vec![0u8; u32::from_le_bytes(key_len) as usize];
        self.reader.read_exact(&mut key)?;
        let mut value = vec![0u8; u32::from_le_bytes(val_len) as usize];
        self.reader.read_exact(&mut value)?;

        self.remaining -= 1;
        Ok(Some((key, value)))
    }
}
