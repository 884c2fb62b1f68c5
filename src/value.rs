//! Data model
//!
//! A `Value` points at where a payload lives; an `Entry` is the unit
//! appended to the WAL for every accepted put.

use serde::{Deserialize, Serialize};

/// Location of a payload in an external value log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Write time (unix millis)
    pub timestamp: i64,

    /// Byte offset inside `source_file`
    pub offset: i64,

    /// File holding the payload
    pub source_file: String,
}

impl Value {
    pub fn new(timestamp: i64, offset: i64, source_file: impl Into<String>) -> Self {
        Self {
            timestamp,
            offset,
            source_file: source_file.into(),
        }
    }

    /// Encode for storage inside a sorted file
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a value previously produced by [`Value::encode`]
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A single accepted write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}
