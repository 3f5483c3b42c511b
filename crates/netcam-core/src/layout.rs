//! On-disk layout of check specs and results
//!
//! ```text
//! <output_dir>/<design>/<device>/<collection>.json           check spec
//! <output_dir>/<design>/<device>/results/<collection>.json   results
//! <output_dir>/<design>/<device>/results/summary.json        device summary
//! <output_dir>/<design>/<device>/results/device-task.json    setup or timeout failure
//! ```
//!
//! The sync helpers here are used by design tooling and the analyzer; the
//! runner reads and writes the same paths with async I/O and the
//! `decode_*`/`encode_*` helpers.

use crate::check::CheckCollection;
use crate::error::{NetcamError, Result};
use crate::result::CheckResult;
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULTS_DIR: &str = "results";
pub const SUMMARY_FILE: &str = "summary.json";
/// Results name for failures of the device as a whole rather than of one
/// collection.
pub const DEVICE_TASK_RESULTS: &str = "device-task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignLayout {
    root: PathBuf,
}

impl DesignLayout {
    pub fn new(output_dir: impl AsRef<Path>, design: &str) -> Self {
        Self {
            root: output_dir.as_ref().join(design),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn device_dir(&self, device: &str) -> PathBuf {
        self.root.join(device)
    }

    pub fn results_dir(&self, device: &str) -> PathBuf {
        self.device_dir(device).join(RESULTS_DIR)
    }

    pub fn spec_path(&self, device: &str, collection: &str) -> PathBuf {
        self.device_dir(device).join(format!("{}.json", collection))
    }

    pub fn results_path(&self, device: &str, collection: &str) -> PathBuf {
        self.results_dir(device).join(format!("{}.json", collection))
    }

    pub fn summary_path(&self, device: &str) -> PathBuf {
        self.results_dir(device).join(SUMMARY_FILE)
    }

    pub fn save_collection(&self, collection: &CheckCollection) -> Result<PathBuf> {
        let path = self.spec_path(&collection.device, &collection.name);
        write_file(&path, &encode_collection(collection)?)?;
        Ok(path)
    }

    /// `None` when no spec was written for this device and collection.
    pub fn load_collection(&self, device: &str, collection: &str) -> Result<Option<CheckCollection>> {
        let path = self.spec_path(device, collection);
        match fs::read(&path) {
            Ok(bytes) => decode_collection(&bytes, &path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NetcamError::io(path, e)),
        }
    }

    pub fn save_results(&self, device: &str, collection: &str, results: &[CheckResult]) -> Result<PathBuf> {
        let path = self.results_path(device, collection);
        write_file(&path, &encode_results(results)?)?;
        Ok(path)
    }

    /// Results for one device and collection.
    ///
    /// A missing, unreadable or malformed file yields `None`: the collection
    /// simply contributes no data.
    pub fn load_results(&self, device: &str, collection: &str) -> Option<Vec<CheckResult>> {
        let path = self.results_path(device, collection);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable results file");
                }
                return None;
            }
        };
        match decode_results(&bytes, &path) {
            Ok(results) => Some(results),
            Err(e) => {
                tracing::warn!(error = %e, "malformed results file ignored");
                None
            }
        }
    }
}

pub fn encode_collection(collection: &CheckCollection) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(collection)?)
}

pub fn decode_collection(bytes: &[u8], path: &Path) -> Result<CheckCollection> {
    serde_json::from_slice(bytes).map_err(|e| NetcamError::spec(path, e))
}

pub fn encode_results(results: &[CheckResult]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(results)?)
}

pub fn decode_results(bytes: &[u8], path: &Path) -> Result<Vec<CheckResult>> {
    serde_json::from_slice(bytes).map_err(|e| NetcamError::spec(path, e))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| NetcamError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| NetcamError::io(path, e))
}
