//! Appliance configuration documents
//!
//! Loads the declarative description of a virtual machine appliance
//! (programs, network interfaces, system settings, VM resources) and
//! combines documents layer by layer:
//! - Scalars: the overlay wins when it sets a value
//! - Lists: base first, then overlay, with `~value` retracting the nearest
//!   earlier `value`
//! - Port lists: sorted, deduplicated, `!port` removes the port (and, on
//!   TCP, the same port from HTTP/HTTPS)
//! - Maps: per-key union, overlay wins

pub mod document;
pub mod entry;
pub mod error;
pub mod interface;
pub mod list;
pub mod merge;
pub mod ports;
pub mod size;

mod codec;

pub use document::{
    ConfigDocument, Filesystem, Logging, NetworkInterface, NfsSettings, PackageInfo, Privilege,
    Program, Route, StdoutMode, SystemSettings, VmSettings,
};
pub use entry::ListEntry;
pub use error::ConfigDocumentError;
pub use interface::{normalize_interface, normalize_interfaces, InterfaceMode};
pub use list::{
    merge_lists, merge_lists_dedup, merge_maps, merge_records, resolve_list, sanitize,
};
pub use merge::{merge, merge_at};
pub use ports::{resolve_ports, resolve_protocol, Protocol};
pub use size::ByteSize;
