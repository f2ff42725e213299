//! Built-in appliance defaults (first layer)
//!
//! Hardcoded baseline applied under every user document when requested.

use appliance_config::{ByteSize, ConfigDocument, Filesystem, StdoutMode};

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    /// Virtual CPUs (default: 1)
    pub cpus: u32,

    /// Memory (default: 256 MiB)
    pub ram: ByteSize,

    /// Disk size (default: 128 MiB)
    pub disk_size: ByteSize,

    /// Console output (default: standard)
    pub stdout_mode: StdoutMode,

    /// Root filesystem (default: ext2)
    pub filesystem: Filesystem,

    /// File descriptor limit (default: 1024)
    pub max_fds: u32,

    /// Unprivileged user programs run as (default: "appliance")
    pub user: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            cpus: 1,
            ram: ByteSize::mib(256),
            disk_size: ByteSize::mib(128),
            stdout_mode: StdoutMode::Standard,
            filesystem: Filesystem::Ext2,
            max_fds: 1024,
            user: "appliance".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a document for merging
    pub fn to_document(&self) -> ConfigDocument {
        let mut doc = ConfigDocument::default();
        doc.vm.cpus = self.cpus;
        doc.vm.ram = self.ram;
        doc.vm.disk_size = self.disk_size;
        doc.system.stdout_mode = Some(self.stdout_mode);
        doc.system.filesystem = Some(self.filesystem);
        doc.system.max_fds = self.max_fds;
        doc.system.user = self.user.clone();
        doc
    }
}
