//! Error types for document decoding and encoding

use std::io;
use std::path::PathBuf;

/// Errors at the document codec boundary. Merging and resolution never fail.
#[derive(Debug, thiserror::Error)]
pub enum ConfigDocumentError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode configuration document: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("Failed to encode configuration document: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Canonical JSON error: {0}")]
    Canonicalize(String),
}

impl ConfigDocumentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
