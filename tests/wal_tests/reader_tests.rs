//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading records from a WAL file
//! - Iterator functionality
//! - Partial write handling
//! - Empty file handling

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use driftkv::wal::{WalReader, WalRecord, WalWriter};
use driftkv::{DriftError, Entry, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("00001.wal");
    (temp_dir, wal_path)
}

fn write_records(path: &PathBuf, count: i64) {
    let mut writer = WalWriter::create(path).unwrap();
    for i in 0..count {
        writer
            .append(&Entry::new(format!("key{i}"), Value::new(i, i, "f")))
            .unwrap();
    }
    writer.close().unwrap();
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_multiple_records() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 3);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for i in 0..3 {
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.lsn, i as u64 + 1);
        assert_eq!(record.entry.key, format!("key{i}"));
    }
    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.position(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_open_missing_file_fails() {
    let (_temp, wal_path) = setup_temp_wal();
    assert!(matches!(WalReader::open(&wal_path), Err(DriftError::Io(_))));
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_yields_all_records() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 25);

    let records: Vec<WalRecord> = WalReader::open(&wal_path)
        .unwrap()
        .records()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 25);
    assert_eq!(records.last().unwrap().lsn, 25);
}

#[test]
fn test_iterator_stops_after_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 2);
    append_raw(&wal_path, &[1, 2, 3]);

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().records().collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(DriftError::WalCorruption(_))));
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_partial_header_reports_corruption_at_intact_offset() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 1);
    let intact = std::fs::metadata(&wal_path).unwrap().len();
    append_raw(&wal_path, &[0u8; 8]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_record().unwrap().is_some());

    let err = reader.next_record().unwrap_err();
    assert!(matches!(err, DriftError::WalCorruption(_)));
    assert_eq!(reader.position(), intact);
}

#[test]
fn test_partial_payload_reports_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 1);

    let extra = WalRecord::new(2, Entry::new("torn", Value::new(0, 0, "f")))
        .encode()
        .unwrap();
    append_raw(&wal_path, &extra[..extra.len() - 3]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_record().unwrap().is_some());
    assert!(matches!(
        reader.next_record(),
        Err(DriftError::WalCorruption(_))
    ));
}
