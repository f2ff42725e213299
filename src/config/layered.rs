//! Layered configuration with provenance
//!
//! Folds configuration documents left to right through the document merge
//! and records where every layer came from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use appliance_config::{merge, ConfigDocument, ConfigDocumentError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::defaults::BuiltinDefaults;

/// Schema version for layered_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "appliancectl/layered_config@1";

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    Builtin,
    File,
}

/// A contributing layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSource {
    /// Origin of this layer
    pub origin: LayerOrigin,

    /// File path (None for builtin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredConfig {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// When the merged content last changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_time: Option<DateTime<Utc>>,

    /// SHA-256 of the canonical JSON of the merged content
    pub content_digest: String,

    /// The merged document
    pub document: ConfigDocument,

    /// Contributing layers in precedence order
    pub sources: Vec<LayerSource>,
}

/// Layering errors
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Failed to read layer {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Layer {} is not valid UTF-8", .0.display())]
    Encoding(PathBuf),

    #[error("Layer {}: {source}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: ConfigDocumentError,
    },

    #[error(transparent)]
    Encode(#[from] ConfigDocumentError),

    #[error("Failed to encode layered configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No configuration layers given")]
    NoLayers,
}

impl LayeredConfig {
    /// Merge the given files in order, optionally on top of the built-in
    /// defaults.
    pub fn build(paths: &[PathBuf], include_defaults: bool) -> Result<Self, LayerError> {
        if paths.is_empty() && !include_defaults {
            return Err(LayerError::NoLayers);
        }

        let mut document = ConfigDocument::default();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        if include_defaults {
            document = merge(&document, &BuiltinDefaults::default().to_document());
            sources.push(LayerSource {
                origin: LayerOrigin::Builtin,
                path: None,
                digest: None,
            });
        }

        // Remaining layers: files, later files override earlier ones
        for path in paths {
            let (layer, digest) = Self::load_layer(path)?;
            document = merge(&document, &layer);
            sources.push(LayerSource {
                origin: LayerOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        let content_digest = document.content_digest()?;
        info!(
            layers = sources.len(),
            digest = %content_digest,
            "merged configuration layers"
        );

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            modification_time: document.modification_time,
            content_digest,
            document,
            sources,
        })
    }

    /// Read one raw layer, returning it with the digest of its bytes
    fn load_layer(path: &Path) -> Result<(ConfigDocument, String), LayerError> {
        let io_err = |source| LayerError::Io {
            path: path.to_path_buf(),
            source,
        };

        let bytes = fs::read(path).map_err(io_err)?;
        let modified = fs::metadata(path).and_then(|m| m.modified()).map_err(io_err)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let text = String::from_utf8(bytes).map_err(|_| LayerError::Encoding(path.to_path_buf()))?;
        let mut layer = ConfigDocument::decode(&text).map_err(|source| LayerError::Document {
            path: path.to_path_buf(),
            source,
        })?;
        layer.modification_time = Some(DateTime::<Utc>::from(modified));

        debug!(path = %path.display(), digest = %digest, "loaded configuration layer");
        Ok((layer, digest))
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the JSON form, provenance included, to `path`
    pub fn write_to_file(&self, path: &Path) -> Result<(), LayerError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| LayerError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "wrote layered configuration");
        Ok(())
    }
}
