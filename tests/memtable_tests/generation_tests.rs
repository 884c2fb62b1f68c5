//! Memtable Generation Tests
//!
//! Tests verify:
//! - Writes are logged before they become visible
//! - Record counting
//! - Recovery from an existing WAL
//! - Finalize into a sorted file
//! - Discarding an empty generation

use std::path::Path;
use std::sync::Arc;
use std::thread;

use driftkv::memtable::Memtable;
use driftkv::storage::SSTableReader;
use driftkv::wal::{WalReader, WalRecovery};
use driftkv::{Config, DriftError, MemtableBackend, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config(dir: &Path, backend: MemtableBackend) -> Config {
    Config::builder()
        .data_dir(dir)
        .memtable_backend(backend)
        .build()
}

fn value(i: i64) -> Value {
    Value::new(i, i * 10, "bfa032537a3d8cb1b79d161afe00819f")
}

/// All (key, value) pairs of a sorted file, in file order
fn read_sorted_file(path: &Path) -> Vec<(String, Value)> {
    let mut reader = SSTableReader::open(path).unwrap();
    let pairs = reader
        .iter()
        .unwrap()
        .map(|pair| {
            let (k, v) = pair.unwrap();
            (String::from_utf8(k).unwrap(), Value::decode(&v).unwrap())
        })
        .collect();
    pairs
}

// =============================================================================
// Write Path Tests
// =============================================================================

#[test]
fn test_create_makes_wal() {
    let temp = TempDir::new().unwrap();
    let memtable = Memtable::create(temp.path(), 3, &config(temp.path(), MemtableBackend::Flat))
        .unwrap();

    assert_eq!(memtable.generation(), 3);
    assert_eq!(memtable.wal_path(), temp.path().join("00003.wal"));
    assert_eq!(memtable.sorted_file_path(), temp.path().join("00003.sst"));
    assert!(memtable.wal_path().exists());
    assert!(memtable.is_empty());
    assert!(!memtable.is_finalized());
}

#[test]
fn test_create_refuses_existing_generation() {
    let temp = TempDir::new().unwrap();
    let cfg = config(temp.path(), MemtableBackend::Flat);
    let _first = Memtable::create(temp.path(), 1, &cfg).unwrap();

    assert!(Memtable::create(temp.path(), 1, &cfg).is_err());
}

#[test]
fn test_set_then_get() {
    for backend in [MemtableBackend::Flat, MemtableBackend::Bucketed] {
        let temp = TempDir::new().unwrap();
        let memtable = Memtable::create(temp.path(), 1, &config(temp.path(), backend)).unwrap();

        memtable.set("alpha", value(1)).unwrap();
        memtable.set("alpha", value(2)).unwrap();
        memtable.set("beta", value(3)).unwrap();

        assert_eq!(memtable.get("alpha"), Some(value(2)));
        assert_eq!(memtable.get("beta"), Some(value(3)));
        assert_eq!(memtable.get("gamma"), None);
        assert_eq!(memtable.len(), 2);
        // Every accepted write counts, overwrites included
        assert_eq!(memtable.record_count(), 3);
    }
}

#[test]
fn test_every_set_is_in_the_wal() {
    let temp = TempDir::new().unwrap();
    let memtable =
        Memtable::create(temp.path(), 1, &config(temp.path(), MemtableBackend::Flat)).unwrap();
    for i in 0..20 {
        memtable.set(format!("key{i}"), value(i)).unwrap();
    }

    let records: Vec<_> = WalReader::open(memtable.wal_path())
        .unwrap()
        .records()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(records.len(), 20);
    assert_eq!(records[19].entry.key, "key19");
    assert_eq!(records[19].entry.value, value(19));
}

#[test]
fn test_concurrent_sets_follow_log_order() {
    let temp = TempDir::new().unwrap();
    let memtable = Arc::new(
        Memtable::create(temp.path(), 1, &config(temp.path(), MemtableBackend::Flat)).unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let memtable = Arc::clone(&memtable);
            thread::spawn(move || {
                for i in 0..200 {
                    memtable.set(format!("key{}", i % 5), value(t * 1000 + i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // The last logged write for each key is the one the table holds
    let mut last_logged = std::collections::HashMap::new();
    for record in WalReader::open(memtable.wal_path()).unwrap().records() {
        let record = record.unwrap();
        last_logged.insert(record.entry.key, record.entry.value);
    }
    assert_eq!(memtable.record_count(), 800);
    assert_eq!(last_logged.len(), 5);
    for (key, logged) in last_logged {
        assert_eq!(memtable.get(&key), Some(logged));
    }
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_replays_wal() {
    let temp = TempDir::new().unwrap();
    let cfg = config(temp.path(), MemtableBackend::Bucketed);
    {
        let memtable = Memtable::create(temp.path(), 4, &cfg).unwrap();
        memtable.set("alpha", value(1)).unwrap();
        memtable.set("beta", value(2)).unwrap();
        memtable.set("alpha", value(3)).unwrap();
    }

    let (memtable, result) = Memtable::recover(temp.path(), 4, &cfg).unwrap();

    assert_eq!(result.entries_recovered, 3);
    assert_eq!(memtable.record_count(), 3);
    assert_eq!(memtable.get("alpha"), Some(value(3)));
    assert_eq!(memtable.get("beta"), Some(value(2)));

    // New writes continue the same log
    memtable.set("gamma", value(4)).unwrap();
    let verify = WalRecovery::verify(memtable.wal_path()).unwrap();
    assert_eq!(verify.entries_recovered, 4);
    assert_eq!(verify.last_lsn, 4);
}

#[test]
fn test_recover_truncates_torn_tail() {
    let temp = TempDir::new().unwrap();
    let cfg = config(temp.path(), MemtableBackend::Flat);
    let wal_path = {
        let memtable = Memtable::create(temp.path(), 1, &cfg).unwrap();
        memtable.set("alpha", value(1)).unwrap();
        memtable.wal_path().to_path_buf()
    };
    let mut bytes = std::fs::read(&wal_path).unwrap();
    bytes.extend_from_slice(&[0x5A; 11]);
    std::fs::write(&wal_path, &bytes).unwrap();

    let (memtable, result) = Memtable::recover(temp.path(), 1, &cfg).unwrap();

    assert!(result.was_truncated);
    assert_eq!(memtable.get("alpha"), Some(value(1)));
    assert_eq!(
        std::fs::metadata(&wal_path).unwrap().len(),
        (bytes.len() - 11) as u64
    );
}

// =============================================================================
// Finalize Tests
// =============================================================================

#[test]
fn test_finalize_writes_sorted_file_and_removes_wal() {
    for backend in [MemtableBackend::Flat, MemtableBackend::Bucketed] {
        let temp = TempDir::new().unwrap();
        let memtable = Memtable::create(temp.path(), 1, &config(temp.path(), backend)).unwrap();
        memtable.set("beta", value(2)).unwrap();
        memtable.set("alpha", value(1)).unwrap();
        memtable.set("gamma", value(3)).unwrap();

        let sstable = memtable.finalize().unwrap();

        assert!(memtable.is_finalized());
        assert!(!temp.path().join("00001.wal").exists());
        assert!(!temp.path().join("00001.sst.tmp").exists());
        assert_eq!(sstable.path, temp.path().join("00001.sst"));
        assert_eq!(sstable.entry_count, 3);
        assert_eq!(sstable.min_key, b"alpha".to_vec());
        assert_eq!(sstable.max_key, b"gamma".to_vec());

        let pairs = read_sorted_file(&sstable.path);
        assert_eq!(
            pairs,
            vec![
                ("alpha".to_string(), value(1)),
                ("beta".to_string(), value(2)),
                ("gamma".to_string(), value(3)),
            ]
        );

        // Still readable from memory until dropped
        assert_eq!(memtable.get("beta"), Some(value(2)));
    }
}

#[test]
fn test_finalize_spills_with_small_sort_budget() {
    let temp = TempDir::new().unwrap();
    let cfg = Config::builder()
        .data_dir(temp.path())
        .sort_memory_budget(512)
        .sort_spill_dir(temp.path())
        .build();
    let memtable = Memtable::create(temp.path(), 1, &cfg).unwrap();
    for i in (0..300).rev() {
        memtable.set(format!("key{i:04}"), value(i)).unwrap();
    }

    let sstable = memtable.finalize().unwrap();
    let pairs = read_sorted_file(&sstable.path);

    assert_eq!(pairs.len(), 300);
    assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(pairs[0], ("key0000".to_string(), value(0)));
}

#[test]
fn test_set_after_finalize_is_rejected() {
    for backend in [MemtableBackend::Flat, MemtableBackend::Bucketed] {
        let temp = TempDir::new().unwrap();
        let memtable = Memtable::create(temp.path(), 1, &config(temp.path(), backend)).unwrap();
        memtable.set("alpha", value(1)).unwrap();
        memtable.finalize().unwrap();

        assert!(matches!(memtable.set("alpha", value(2)), Err(DriftError::Closed)));
        assert!(matches!(memtable.set("beta", value(2)), Err(DriftError::Closed)));

        // A rejected write never reaches the table or the counter
        assert_eq!(memtable.get("alpha"), Some(value(1)));
        assert_eq!(memtable.get("beta"), None);
        assert_eq!(memtable.record_count(), 1);
        assert_eq!(memtable.len(), 1);

        assert!(memtable.finalize().is_err());
    }
}

// =============================================================================
// Discard Tests
// =============================================================================

#[test]
fn test_discard_empty_generation() {
    let temp = TempDir::new().unwrap();
    let memtable =
        Memtable::create(temp.path(), 1, &config(temp.path(), MemtableBackend::Flat)).unwrap();

    memtable.discard().unwrap();

    assert!(!memtable.wal_path().exists());
    assert!(!temp.path().join("00001.sst").exists());
}

#[test]
fn test_discard_refuses_non_empty_generation() {
    let temp = TempDir::new().unwrap();
    let memtable =
        Memtable::create(temp.path(), 1, &config(temp.path(), MemtableBackend::Flat)).unwrap();
    memtable.set("alpha", value(1)).unwrap();

    assert!(memtable.discard().is_err());
    assert!(memtable.wal_path().exists());
}
