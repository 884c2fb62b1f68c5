//! # driftkv
//!
//! An embedded log-structured key-value storage engine with:
//! - A write-ahead log per memtable generation for durability
//! - Crash recovery that replays surviving WALs on open
//! - Concurrent puts and gets against sharded in-memory tables
//! - Background rotation of full memtables into immutable sorted files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Db                                │
//! │      put / get (slot read lock)   rotation monitor thread    │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │ swap (slot write lock)
//!                ▼                              ▼
//!   ┌─────────────────────────┐    ┌─────────────────────────┐
//!   │   Active Memtable (N)   │    │  Retiring Memtable (N-1) │
//!   │  WAL ──► sharded table  │    │   still readable         │
//!   │  fsync task             │    └────────────┬────────────┘
//!   └─────────────────────────┘                 │ finalize
//!                                               ▼
//!                                  ┌─────────────────────────┐
//!                                  │  External Sorter        │
//!                                  │  (spilled runs + merge) │
//!                                  └────────────┬────────────┘
//!                                               ▼
//!                                  ┌─────────────────────────┐
//!                                  │  {N-1}.sst (SSTable)    │
//!                                  └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use driftkv::{Db, Value};
//!
//! let db = Db::open("/var/lib/driftkv")?;
//! db.put("alpha", Value::new(1, 0, "f"))?;
//! assert_eq!(db.get("alpha"), Some(Value::new(1, 0, "f")));
//! db.close()?;
//! # Ok::<(), driftkv::DriftError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod db;
pub mod fingerprint;
pub mod memtable;
pub mod sort;
pub mod storage;
pub mod value;
pub mod wal;

mod task;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, MemtableBackend};
pub use db::{Db, Health};
pub use error::{DriftError, Result};
pub use fingerprint::FingerprintKind;
pub use value::{Entry, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of driftkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
