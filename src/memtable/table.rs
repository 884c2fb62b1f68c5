//! Table backends
//!
//! The storage behind a memtable, independent of its WAL.

use dashmap::DashMap;

use crate::error::Result;
use crate::value::Value;

/// Concurrent key → value table
pub trait Table: Send + Sync {
    /// Insert or overwrite a key
    fn insert(&self, key: String, value: Value);

    fn get(&self, key: &str) -> Option<Value>;

    /// Number of distinct keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every entry once, in no particular order. Stops at the first error.
    fn for_each(&self, visit: &mut dyn FnMut(&str, &Value) -> Result<()>) -> Result<()>;
}

/// Flat sharded map
#[derive(Default)]
pub struct FlatTable {
    map: DashMap<String, Value>,
}

impl FlatTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Table for FlatTable {
    fn insert(&self, key: String, value: Value) {
        self.map.insert(key, value);
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn for_each(&self, visit: &mut dyn FnMut(&str, &Value) -> Result<()>) -> Result<()> {
        for entry in self.map.iter() {
            visit(entry.key(), entry.value())?;
        }
        Ok(())
    }
}
