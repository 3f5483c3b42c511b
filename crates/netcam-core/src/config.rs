//! Verification run configuration
use crate::error::{NetcamError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const OUTPUT_DIR_ENV: &str = "NETCAM_OUTPUT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Root of persisted spec and result files.
    pub output_dir: PathBuf,

    /// Upper bound on a device's Running phase; unbounded when unset.
    pub running_timeout_secs: Option<u64>,

    /// Upsert results into the result store as well as writing files.
    pub store: bool,

    pub log: LogConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("netcam-out"),
            running_timeout_secs: None,
            store: true,
            log: LogConfig::default(),
        }
    }
}

impl VerifyConfig {
    /// Load config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| NetcamError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| NetcamError::io(path, e))?;
        Self::from_yaml(&text)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn running_timeout(&self) -> Option<Duration> {
        self.running_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `netcam_runner=debug`.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
