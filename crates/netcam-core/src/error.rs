//! Unified Error Model
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetcamError {
    #[error("IO/{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SPEC/{path}: {reason}")]
    Spec { path: PathBuf, reason: String },

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("SERIALIZE/{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("SCHEMA/{0}")]
    Schema(String),
}

impl NetcamError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NetcamError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn spec(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        NetcamError::Spec {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = NetcamError> = std::result::Result<T, E>;
