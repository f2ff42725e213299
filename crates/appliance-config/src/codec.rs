//! Decode/encode boundary
//!
//! `decode*` keeps markers intact so the document can still act as an
//! overlay; `load*` resolves them.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::document::ConfigDocument;
use crate::error::ConfigDocumentError;
use crate::merge::merge;

impl ConfigDocument {
    /// Decode a raw document. Markers are preserved.
    pub fn decode(text: &str) -> Result<Self, ConfigDocumentError> {
        Ok(toml::from_str(text)?)
    }

    /// Decode and resolve a document.
    pub fn load(text: &str) -> Result<Self, ConfigDocumentError> {
        Ok(Self::decode(text)?.resolved())
    }

    /// Decode a raw document from a file, taking the file's mtime as the
    /// modification time.
    pub fn decode_file(path: &Path) -> Result<Self, ConfigDocumentError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigDocumentError::io(path, e))?;
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| ConfigDocumentError::io(path, e))?;

        let mut doc = Self::decode(&text)?;
        doc.modification_time = Some(DateTime::<Utc>::from(modified));
        debug!(path = %path.display(), "decoded configuration document");
        Ok(doc)
    }

    /// Decode and resolve a document from a file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigDocumentError> {
        Ok(Self::decode_file(path)?.resolved())
    }

    /// Merge the document stored at `path` on top of this one.
    pub fn overlay_file(&self, path: &Path) -> Result<Self, ConfigDocumentError> {
        let overlay = Self::decode_file(path)?;
        Ok(merge(self, &overlay))
    }

    /// Encode as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigDocumentError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigDocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the TOML encoding to `path`.
    pub fn write_toml(&self, path: &Path) -> Result<(), ConfigDocumentError> {
        let text = self.to_toml()?;
        fs::write(path, text).map_err(|e| ConfigDocumentError::io(path, e))
    }

    /// SHA-256 hex digest of the RFC 8785 canonical JSON of the content.
    /// The modification time is not part of the content.
    pub fn content_digest(&self) -> Result<String, ConfigDocumentError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(self)
            .map_err(|e| ConfigDocumentError::Canonicalize(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}
