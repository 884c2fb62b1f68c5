//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for one memtable generation through append-only logging.
//!
//! ## Responsibilities
//! - Append every accepted entry before it becomes visible in memory
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay (torn tails are truncated)
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Entry  │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Entry  │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! `Entry` is the bincode encoding of [`crate::value::Entry`]; all integers
//! are little-endian and the CRC covers the entry bytes only.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{WalRecord, HEADER_SIZE};
pub use reader::WalReader;
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
