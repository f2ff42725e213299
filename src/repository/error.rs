//! Repository client errors

use std::io;
use std::path::PathBuf;

/// Errors from key storage and package upload
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("No authentication key available: provide --key NAME or create a default key with `repositories keys create NAME TOKEN --default`")]
    NoDefaultKey,

    #[error("Key '{0}' already exists; provide --force to overwrite")]
    KeyFileExists(String),

    #[error("Invalid key name '{0}'")]
    InvalidKeyName(String),

    #[error("Invalid target '{0}': expected ORG/BUCKET/APP")]
    InvalidTarget(String),

    #[error("Package source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Upload failed: {status}: {body}")]
    UploadFailed { status: String, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RepositoryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
