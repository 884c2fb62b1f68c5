//! Fingerprint-bucketed table
//!
//! Keys are grouped by the fingerprint of the key; each bucket is a small
//! ordered map, so a lookup is one hash probe plus an ordered search inside
//! the bucket.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::error::Result;
use crate::fingerprint::{Fingerprint, KeyFingerprint};
use crate::value::Value;

use super::Table;

pub struct BucketedTable {
    buckets: DashMap<Fingerprint, BTreeMap<String, Value>>,
    fingerprint: Box<dyn KeyFingerprint>,
    /// Distinct keys across all buckets
    len: AtomicUsize,
}

impl BucketedTable {
    pub fn new(fingerprint: Box<dyn KeyFingerprint>) -> Self {
        Self {
            buckets: DashMap::new(),
            fingerprint,
            len: AtomicUsize::new(0),
        }
    }

    /// Number of non-empty buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn fingerprint(&self) -> &dyn KeyFingerprint {
        self.fingerprint.as_ref()
    }
}

impl Table for BucketedTable {
    fn insert(&self, key: String, value: Value) {
        let digest = self.fingerprint.digest(key.as_bytes());
        let mut bucket = self.buckets.entry(digest).or_default();
        if bucket.insert(key, value).is_none() {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        let digest = self.fingerprint.digest(key.as_bytes());
        let bucket = self.buckets.get(&digest)?;
        bucket.get(key).cloned()
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    fn for_each(&self, visit: &mut dyn FnMut(&str, &Value) -> Result<()>) -> Result<()> {
        for bucket in self.buckets.iter() {
            for (key, value) in bucket.value() {
                visit(key, value)?;
            }
        }
        Ok(())
    }
}
