//! Key fingerprints
//!
//! A fingerprint is a fixed-size digest of a key. The bucketed memtable
//! groups keys by fingerprint so each lookup only scans one small ordered
//! bucket.
//!
//! The fingerprint kind is persisted in the store manifest. Reopening a store
//! with a different kind is rejected, since buckets built with one digest
//! cannot be found with another.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

/// Digest bytes of a key
pub type Fingerprint = Box<[u8]>;

/// Closed set of fingerprint implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintKind {
    /// SHA-512 (64 bytes)
    Sha512,

    /// XXH64 with seed 0 (8 bytes, big-endian)
    Xxh64,
}

impl FingerprintKind {
    /// Instantiate the implementation for this kind
    pub fn build(self) -> Box<dyn KeyFingerprint> {
        match self {
            FingerprintKind::Sha512 => Box::new(Sha512Fingerprint),
            FingerprintKind::Xxh64 => Box::new(Xxh64Fingerprint),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FingerprintKind::Sha512 => "sha512",
            FingerprintKind::Xxh64 => "xxh64",
        }
    }
}

impl std::str::FromStr for FingerprintKind {
    type Err = crate::DriftError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha512" => Ok(FingerprintKind::Sha512),
            "xxh64" => Ok(FingerprintKind::Xxh64),
            other => Err(crate::DriftError::Config(format!(
                "unknown fingerprint: {other}"
            ))),
        }
    }
}

/// Computes a fixed-size digest of a key
pub trait KeyFingerprint: Send + Sync {
    fn kind(&self) -> FingerprintKind;

    /// Digest length in bytes
    fn size(&self) -> usize;

    fn digest(&self, key: &[u8]) -> Fingerprint;
}

/// Cryptographic fingerprint
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Fingerprint;

impl KeyFingerprint for Sha512Fingerprint {
    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Sha512
    }

    fn size(&self) -> usize {
        64
    }

    fn digest(&self, key: &[u8]) -> Fingerprint {
        Sha512::digest(key).to_vec().into_boxed_slice()
    }
}

/// Fast non-cryptographic fingerprint
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh64Fingerprint;

impl Xxh64Fingerprint {
    pub fn hash64(key: &[u8]) -> u64 {
        xxhash_rust::xxh64::xxh64(key, 0)
    }
}

impl KeyFingerprint for Xxh64Fingerprint {
    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Xxh64
    }

    fn size(&self) -> usize {
        8
    }

    fn digest(&self, key: &[u8]) -> Fingerprint {
        Box::new(Self::hash64(key).to_be_bytes())
    }
}
