//! Layered appliance configuration
//!
//! Builds the effective document from:
//! 1. Built-in defaults (optional)
//! 2. Each configuration file, in the order given

mod defaults;
mod layered;

pub use defaults::BuiltinDefaults;
pub use layered::{LayerError, LayerOrigin, LayerSource, LayeredConfig, SCHEMA_ID, SCHEMA_VERSION};
