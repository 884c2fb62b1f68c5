//! WAL record definitions
//!
//! Defines the framing of individual WAL records.

use crate::error::{DriftError, Result};
use crate::value::Entry;

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A decoded WAL record
#[derive(Debug, Clone, PartialEq)]
pub struct WalRecord {
    /// Log Sequence Number - monotonically increasing within one WAL
    pub lsn: u64,

    /// The logged write
    pub entry: Entry,
}

impl WalRecord {
    pub fn new(lsn: u64, entry: Entry) -> Self {
        Self { lsn, entry }
    }

    /// Frame the record: header followed by the encoded entry
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_record(self.lsn, &self.entry)
    }
}

pub(crate) fn encode_record(lsn: u64, entry: &Entry) -> Result<Vec<u8>> {
    let data = bincode::serialize(entry)?;
    let len = u32::try_from(data.len()).map_err(|_| {
        DriftError::Encoding(format!("WAL entry too large: {} bytes", data.len()))
    })?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + data.len());
    buf.extend_from_slice(&lsn.to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(&data).to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&data);
    Ok(buf)
}

/// Parsed record header
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl RecordHeader {
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);
        Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        }
    }

    /// Check the payload against the stored checksum and decode it
    pub fn decode_payload(&self, data: &[u8]) -> Result<WalRecord> {
        let actual = crc32fast::hash(data);
        if actual != self.crc {
            return Err(DriftError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                self.lsn, self.crc, actual
            )));
        }
        let entry: Entry = bincode::deserialize(data)?;
        Ok(WalRecord::new(self.lsn, entry))
    }
}
