//! Package repository client
//!
//! Stores named authentication keys and uploads packages to a repository.

mod error;
pub mod keys;
pub mod push;

pub use error::RepositoryError;
pub use keys::{CreateKeyOptions, KeyStore, DEFAULT_KEY};
pub use push::{
    check_status, push, upload_url, AppTarget, HttpUploader, MemoryUploader, PushOptions,
    PushReceipt, RecordedUpload, Uploader,
};
