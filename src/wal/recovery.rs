//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{DriftError, Result};

use super::{WalReader, WalRecord};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub entries_recovered: u64,

    /// Last valid LSN (0 if the log is empty)
    pub last_lsn: u64,

    /// Length of the intact prefix of the file
    pub valid_len: u64,

    /// Whether the WAL was truncated (torn tail removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover records from a WAL file
    ///
    /// This will:
    /// 1. Read records until the first torn or corrupted one
    /// 2. Truncate the file to the intact prefix
    /// 3. Return all intact records in order
    pub fn recover(path: &Path) -> Result<(Vec<WalRecord>, RecoveryResult)> {
        let (records, mut result) = Self::scan(path)?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                path = %path.display(),
                valid_len = result.valid_len,
                "truncated torn WAL tail"
            );
        }
        result.entries_recovered = records.len() as u64;

        Ok((records, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path).map(|(_, result)| result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalRecord>, RecoveryResult)> {
        let file_len = std::fs::metadata(path)?.len();
        let mut reader = WalReader::open(path)?;
        let mut records = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_record() {
                Ok(Some(record)) => {
                    result.last_lsn = record.lsn;
                    records.push(record);
                }
                Ok(None) => break,
                Err(DriftError::WalCorruption(reason)) => {
                    tracing::warn!(
                        path = %path.display(),
                        offset = reader.position(),
                        %reason,
                        "stopping WAL replay at damaged record"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        result.valid_len = reader.position();
        result.was_truncated = result.valid_len < file_len;
        result.entries_recovered = records.len() as u64;
        Ok((records, result))
    }
}
