//! Stage checkpoints on disk.
//!
//! Each pipeline stage hands its output to the next one through a file. The
//! bytes are opaque here (the engine decides the encoding, pickle for the VAST
//! engine); this module only writes them atomically and keeps a
//! `<file>.sha256` sidecar so that a resumed run can tell a complete
//! checkpoint from a truncated or foreign one.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// State of a checkpoint file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    Missing,
    /// Present and matching its sidecar digest
    Verified,
    /// Present without a sidecar, e.g. written by the Python scripts
    Unverified,
    /// Present but its digest differs from the sidecar
    Corrupt,
}

impl CheckpointStatus {
    pub fn is_reusable(self) -> bool {
        matches!(self, CheckpointStatus::Verified | CheckpointStatus::Unverified)
    }
}

/// Reads and writes checkpoint files with digest sidecars.
pub struct CheckpointStore;

impl CheckpointStore {
    /// Path of the digest sidecar for `path`.
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".sha256");
        PathBuf::from(name)
    }

    /// Hex SHA-256 of `bytes`.
    pub fn digest(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Write `bytes` to `path` via a temporary file and rename, then the sidecar.
    pub fn write(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write checkpoint: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move checkpoint into place: {}", path.display()))?;

        let sidecar = Self::sidecar_path(path);
        fs::write(&sidecar, format!("{}\n", Self::digest(bytes)))
            .with_context(|| format!("Failed to write checkpoint digest: {}", sidecar.display()))?;

        debug!("Wrote checkpoint {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Read a checkpoint, verifying it against its sidecar when one exists.
    pub fn read(path: &Path) -> Result<Vec<u8>> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?;

        match Self::expected_digest(path)? {
            Some(expected) if expected != Self::digest(&bytes) => {
                bail!("Checkpoint digest mismatch: {}", path.display())
            }
            Some(_) => {}
            None => warn!("Checkpoint {} has no digest sidecar, loading unverified", path.display()),
        }

        debug!("Read checkpoint {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }

    /// Inspect a checkpoint without loading it into the caller.
    pub fn status(path: &Path) -> Result<CheckpointStatus> {
        if !path.exists() {
            return Ok(CheckpointStatus::Missing);
        }
        let Some(expected) = Self::expected_digest(path)? else {
            return Ok(CheckpointStatus::Unverified);
        };
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?;

        if expected == Self::digest(&bytes) {
            Ok(CheckpointStatus::Verified)
        } else {
            Ok(CheckpointStatus::Corrupt)
        }
    }

    fn expected_digest(path: &Path) -> Result<Option<String>> {
        let sidecar = Self::sidecar_path(path);
        if !sidecar.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&sidecar)
            .with_context(|| format!("Failed to read checkpoint digest: {}", sidecar.display()))?;
        Ok(Some(content.trim().to_string()))
    }
}
