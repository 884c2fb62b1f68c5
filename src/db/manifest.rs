//! Store manifest
//!
//! Persists the options that must never change for the lifetime of a store.
//! Written once, on first open, as `{dir}/MANIFEST`.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};
use crate::fingerprint::FingerprintKind;
use crate::storage::sync_dir;

pub const MANIFEST_FILE: &str = "MANIFEST";

const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u16,
    pub fingerprint: FingerprintKind,
}

impl Manifest {
    /// Load the manifest, or write one for a fresh store
    ///
    /// Fails with `Config` if the store was created with another fingerprint.
    pub fn load_or_create(dir: &Path, fingerprint: FingerprintKind) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);

        if path.exists() {
            let bytes = fs::read(&path)?;
            let manifest: Manifest = bincode::deserialize(&bytes).map_err(|e| {
                DriftError::Initialization(format!("unreadable manifest {}: {}", path.display(), e))
            })?;

            if manifest.format_version != FORMAT_VERSION {
                return Err(DriftError::Initialization(format!(
                    "unsupported store format version {}",
                    manifest.format_version
                )));
            }
            if manifest.fingerprint != fingerprint {
                return Err(DriftError::Config(format!(
                    "store was created with fingerprint {}, cannot open with {}",
                    manifest.fingerprint.name(),
                    fingerprint.name()
                )));
            }
            return Ok(manifest);
        }

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            fingerprint,
        };
        let temp_path = dir.join(format!("{}.tmp", MANIFEST_FILE));
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bincode::serialize(&manifest)?)?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;
        sync_dir(dir)?;

        tracing::info!(fingerprint = fingerprint.name(), "created store manifest");
        Ok(manifest)
    }
}
