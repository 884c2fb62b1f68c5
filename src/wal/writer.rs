//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::value::Entry;

use super::entry::encode_record;

/// Appends records to one WAL file
///
/// Each record is framed in memory and handed to the OS with a single
/// `write_all`, so a concurrent `sync` (serialized by the owner's lock) never
/// observes half a record.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    next_lsn: u64,
    bytes_written: u64,
}

impl WalWriter {
    /// Create a new, empty WAL file. Fails if the file already exists.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: 1,
            bytes_written: 0,
        })
    }

    /// Reopen an existing WAL for appending after recovery.
    ///
    /// `valid_len` is the end of the last intact record; anything after it is
    /// cut off before new records are appended.
    pub fn open_append(path: &Path, valid_len: u64, next_lsn: u64) -> Result<Self> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        if file.metadata()?.len() != valid_len {
            file.set_len(valid_len)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(valid_len))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn,
            bytes_written: valid_len,
        })
    }

    /// Append an entry to the WAL, returning its LSN
    pub fn append(&mut self, entry: &Entry) -> Result<u64> {
        let lsn = self.next_lsn;
        let buf = encode_record(lsn, entry)?;
        self.file.write_all(&buf)?;

        self.next_lsn += 1;
        self.bytes_written += buf.len() as u64;
        Ok(lsn)
    }

    /// Force data to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Sync and close the file
    pub fn close(mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Current file length in bytes
    pub fn len(&self) -> u64 {
        self.bytes_written
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_written == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
