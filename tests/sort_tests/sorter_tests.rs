//! External Sorter Tests
//!
//! Tests verify:
//! - Ascending output with and without spilled runs
//! - Stability for equal keys
//! - Last-write-wins deduplication
//! - Repeated sort passes

use driftkv::sort::{ExternalSorter, SortOptions};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sorter(memory_budget: usize, dedupe: bool) -> ExternalSorter {
    ExternalSorter::new(SortOptions {
        memory_budget,
        spill_dir: None,
        dedupe,
    })
}

fn drain(sorter: &mut ExternalSorter) -> Vec<(Vec<u8>, Vec<u8>)> {
    let pairs = sorter.sort().unwrap().collect::<Result<Vec<_>, _>>().unwrap();
    pairs
}

/// Deterministic shuffle of 0..n
fn scrambled(n: u64) -> Vec<u64> {
    let mut out: Vec<u64> = (0..n).collect();
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for i in (1..out.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.swap(i, (state % (i as u64 + 1)) as usize);
    }
    out
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_empty_sorter() {
    let mut sorter = sorter(1024, false);
    assert!(sorter.is_empty());
    assert!(drain(&mut sorter).is_empty());
    sorter.close().unwrap();
}

#[test]
fn test_sort_in_memory() {
    let mut sorter = sorter(64 * 1024 * 1024, false);
    for key in ["delta", "alpha", "charlie", "bravo"] {
        sorter.put(key.as_bytes(), b"v").unwrap();
    }

    let keys: Vec<Vec<u8>> = drain(&mut sorter).into_iter().map(|(k, _)| k).collect();

    assert_eq!(sorter.spilled_runs(), 0);
    assert_eq!(
        keys,
        vec![b"alpha".to_vec(), b"bravo".to_vec(), b"charlie".to_vec(), b"delta".to_vec()]
    );
}

#[test]
fn test_sort_across_spilled_runs() {
    let mut sorter = sorter(256, false);
    for i in scrambled(1000) {
        sorter
            .put(format!("key{i:06}").as_bytes(), &i.to_le_bytes())
            .unwrap();
    }

    assert!(sorter.spilled_runs() > 1);
    assert_eq!(sorter.len(), 1000);

    let pairs = drain(&mut sorter);
    assert_eq!(pairs.len(), 1000);
    for (i, (key, value)) in pairs.iter().enumerate() {
        assert_eq!(key, format!("key{i:06}").as_bytes());
        assert_eq!(value, &(i as u64).to_le_bytes());
    }
}

#[test]
fn test_spill_dir_is_used() {
    let temp = TempDir::new().unwrap();
    let mut sorter = ExternalSorter::new(SortOptions {
        memory_budget: 64,
        spill_dir: Some(temp.path().to_path_buf()),
        dedupe: false,
    });
    for i in (0..50u32).rev() {
        sorter.put(&i.to_be_bytes(), b"").unwrap();
    }

    let pairs = drain(&mut sorter);
    assert!(sorter.spilled_runs() > 0);
    assert_eq!(pairs.first().unwrap().0, 0u32.to_be_bytes().to_vec());
    assert_eq!(pairs.last().unwrap().0, 49u32.to_be_bytes().to_vec());
}

// =============================================================================
// Duplicate Key Tests
// =============================================================================

#[test]
fn test_equal_keys_keep_put_order() {
    // Tiny budget: the duplicates land in different runs
    let mut sorter = sorter(48, false);
    for i in 0..20u32 {
        sorter.put(b"same", &i.to_le_bytes()).unwrap();
        sorter.put(b"other", &i.to_le_bytes()).unwrap();
    }

    let pairs = drain(&mut sorter);
    let same: Vec<Vec<u8>> = pairs
        .iter()
        .filter(|(k, _)| k == b"same")
        .map(|(_, v)| v.clone())
        .collect();
    let expected: Vec<Vec<u8>> = (0..20u32).map(|i| i.to_le_bytes().to_vec()).collect();

    assert_eq!(pairs.len(), 40);
    assert_eq!(same, expected);
}

#[test]
fn test_dedupe_keeps_last_put() {
    let mut sorter = sorter(48, true);
    for i in 0..10u32 {
        sorter.put(b"b", &i.to_le_bytes()).unwrap();
        sorter.put(b"a", &(100 + i).to_le_bytes()).unwrap();
    }
    sorter.put(b"c", b"only").unwrap();

    let pairs = drain(&mut sorter);

    assert_eq!(
        pairs,
        vec![
            (b"a".to_vec(), 109u32.to_le_bytes().to_vec()),
            (b"b".to_vec(), 9u32.to_le_bytes().to_vec()),
            (b"c".to_vec(), b"only".to_vec()),
        ]
    );
}

// =============================================================================
// Restart Tests
// =============================================================================

#[test]
fn test_sort_can_run_twice() {
    let mut sorter = sorter(128, false);
    for i in scrambled(200) {
        sorter.put(&i.to_be_bytes(), b"x").unwrap();
    }

    let first = drain(&mut sorter);
    let second = drain(&mut sorter);

    assert_eq!(first.len(), 200);
    assert_eq!(first, second);
    sorter.close().unwrap();
}

#[test]
fn test_partial_pass_then_full_pass() {
    let mut sorter = sorter(128, false);
    for i in scrambled(100) {
        sorter.put(&i.to_be_bytes(), b"x").unwrap();
    }

    let head: Vec<_> = sorter.sort().unwrap().take(5).map(|p| p.unwrap().0).collect();
    let full = drain(&mut sorter);

    assert_eq!(head.len(), 5);
    assert_eq!(head[0], 0u64.to_be_bytes().to_vec());
    assert_eq!(full.len(), 100);
}
