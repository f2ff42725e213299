//! appliancectl - appliance configuration layering and repository client
//!
//! This crate builds the effective configuration of a virtual machine
//! appliance from layered documents and publishes packages to a remote
//! repository using stored authentication keys.

pub mod config;
pub mod repository;

pub use appliance_config::{merge, ConfigDocument, ConfigDocumentError};
pub use config::{BuiltinDefaults, LayerError, LayeredConfig};
pub use repository::{
    push, AppTarget, CreateKeyOptions, HttpUploader, KeyStore, PushOptions, RepositoryError,
    Uploader,
};
