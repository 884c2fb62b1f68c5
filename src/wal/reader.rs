//! WAL Reader
//!
//! Handles reading records from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{DriftError, Result};

use super::entry::RecordHeader;
use super::{WalRecord, HEADER_SIZE};

/// Upper bound on a single encoded entry; larger lengths mean a damaged header
const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;

/// Reads records from a WAL file front to back
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last record successfully returned
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next record from the WAL
    ///
    /// Returns:
    /// - `Ok(Some(record))`: an intact record
    /// - `Ok(None)`: clean end of file
    /// - `Err(WalCorruption)`: torn or corrupted record at `position()`
    pub fn next_record(&mut self) -> Result<Option<WalRecord>> {
        let mut header = [0u8; HEADER_SIZE];
        let read = read_fully(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(DriftError::WalCorruption(format!(
                "truncated header at offset {}",
                self.position
            )));
        }

        let header = RecordHeader::parse(&header);
        if header.len > MAX_RECORD_SIZE {
            return Err(DriftError::WalCorruption(format!(
                "implausible record length {} at offset {}",
                header.len, self.position
            )));
        }
        let mut data = vec![0u8; header.len as usize];
        if read_fully(&mut self.reader, &mut data)? < data.len() {
            return Err(DriftError::WalCorruption(format!(
                "truncated record at offset {} (lsn {})",
                self.position, header.lsn
            )));
        }

        let record = header.decode_payload(&data).map_err(|e| match e {
            DriftError::WalCorruption(msg) => DriftError::WalCorruption(msg),
            other => DriftError::WalCorruption(format!(
                "undecodable entry at offset {}: {}",
                self.position, other
            )),
        })?;

        self.position += (HEADER_SIZE + data.len()) as u64;
        Ok(Some(record))
    }

    /// Offset just past the last intact record read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over records, stopping after the first error
    pub fn records(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL records
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Like `read_exact`, but reports how many bytes were read before EOF
fn read_fully(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
