//! Test fixtures for layered configuration documents
//!
//! - `layers/base.toml`: a complete appliance with two interfaces
//! - `layers/override.toml`: a user overlay using negation and retraction

use std::path::{Path, PathBuf};

/// Path to the base layer
pub fn base_layer_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/layers/base.toml")
}

/// Path to the override layer
pub fn override_layer_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/layers/override.toml")
}

/// Raw text of a fixture layer
pub fn read_layer(path: &Path) -> String {
    std::fs::read_to_string(path).expect("fixture layer readable")
}
