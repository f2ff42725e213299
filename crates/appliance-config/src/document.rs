//! Configuration document data model
//!
//! One [`ConfigDocument`] describes a whole appliance. Field names on disk
//! are stable and case-sensitive; every field may be omitted.

use std::collections::BTreeMap;
use std::fmt;
use std::mem;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::entry::ListEntry;
use crate::interface::normalize_interfaces;
use crate::list::{resolve_list, resolve_tokens};
use crate::size::ByteSize;

/// Aggregate root: everything needed to build and run an appliance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Programs in execution order
    #[serde(default, rename = "program", skip_serializing_if = "Vec::is_empty")]
    pub programs: Vec<Program>,

    /// Network interfaces in declaration order
    #[serde(default, rename = "network", skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkInterface>,

    #[serde(default, skip_serializing_if = "SystemSettings::is_empty")]
    pub system: SystemSettings,

    #[serde(default, skip_serializing_if = "PackageInfo::is_empty")]
    pub info: PackageInfo,

    #[serde(default, skip_serializing_if = "VmSettings::is_empty")]
    pub vm: VmSettings,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nfs: Vec<NfsSettings>,

    #[serde(default, rename = "route", skip_serializing_if = "Vec::is_empty")]
    pub routing: Vec<Route>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logging: Vec<Logging>,

    /// Kernel parameters, keyed by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctl: BTreeMap<String, String>,

    /// When the content last changed semantically. Never encoded.
    #[serde(skip)]
    pub modification_time: Option<DateTime<Utc>>,
}

/// Privilege level a program runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Full rights, runs as root
    Root,
    /// Runs as the configured user with sudo-level rights
    Superuser,
    /// Runs as the configured user without elevated rights
    User,
}

/// One program started inside the appliance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub binary: String,

    /// Argument string, split by the appliance init
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub args: String,

    /// `KEY=value` pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cwd: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,

    /// Commands run before the program starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bootstrap: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logfiles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privilege: Option<Privilege>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub strace: bool,
}

/// A network interface and the ports it exposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Static address, `dhcp`, or empty / `!` / `disabled`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mask: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gateway: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub udp: Vec<ListEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tcp: Vec<ListEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http: Vec<ListEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub https: Vec<ListEntry>,

    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub mtu: u32,

    #[serde(default, rename = "disable-tso", skip_serializing_if = "is_false")]
    pub disable_tso: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub tcpdump: bool,
}

/// An NFS mount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfsSettings {
    #[serde(default, rename = "mount", skip_serializing_if = "String::is_empty")]
    pub mount_point: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub options: String,
}

/// A static route
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interface: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gateway: String,
}

/// Where the console output of the appliance goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdoutMode {
    Standard,
    Screen,
    Serial,
    Disabled,
}

/// Root filesystem type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filesystem {
    Ext2,
    Xfs,
    Fat,
}

/// System-wide settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<ListEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ntp: Vec<ListEntry>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    #[serde(default, rename = "max-fds", skip_serializing_if = "is_zero_u32")]
    pub max_fds: u32,

    #[serde(default, rename = "output-mode", skip_serializing_if = "Option::is_none")]
    pub stdout_mode: Option<StdoutMode>,

    /// Whitespace-separated kernel command line flags
    #[serde(default, rename = "kernel-args", skip_serializing_if = "String::is_empty")]
    pub kernel_args: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystem: Option<Filesystem>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
}

/// Package metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Release date, from a TOML datetime literal or a string
    #[serde(
        default,
        deserialize_with = "deserialize_date",
        skip_serializing_if = "String::is_empty"
    )]
    pub date: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// VM resource sizing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmSettings {
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub cpus: u32,

    #[serde(default, skip_serializing_if = "ByteSize::is_zero")]
    pub ram: ByteSize,

    /// Inode quota for the root filesystem
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub inodes: u64,

    /// Kernel identifier, e.g. a version string
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel: String,

    #[serde(default, rename = "disk-size", skip_serializing_if = "ByteSize::is_zero")]
    pub disk_size: ByteSize,
}

/// A log sink
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Logging {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<String>,

    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Accepts `date = 2020-05-01T00:00:00Z` as well as `date = "2020-05-01"`.
/// TOML hands datetimes to serde as a one-entry map holding the text form.
fn deserialize_date<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct DateVisitor;

    impl<'de> Visitor<'de> for DateVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a date string or a TOML datetime")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<String, A::Error> {
            match map.next_entry::<String, String>()? {
                Some((_, text)) => Ok(text),
                None => Err(de::Error::invalid_length(0, &self)),
            }
        }
    }

    deserializer.deserialize_any(DateVisitor)
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_u32(n: &u32) -> bool {
    *n == 0
}

fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

impl SystemSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl PackageInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl VmSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ConfigDocument {
    /// Resolve every marker in place.
    ///
    /// Port lists are resolved per interface (TCP first so its cascade is
    /// visible to HTTP/HTTPS), interfaces are normalized, and the general
    /// string lists are deduplicated and sanitized. Resolving a resolved
    /// document changes nothing.
    pub fn resolve(&mut self) {
        normalize_interfaces(&mut self.networks);

        let dns = mem::take(&mut self.system.dns);
        self.system.dns = resolve_list(&[&dns]);
        let ntp = mem::take(&mut self.system.ntp);
        self.system.ntp = resolve_list(&[&ntp]);
        self.system.kernel_args = resolve_tokens(&[self.system.kernel_args.as_str()]);
    }

    /// Consume and return the resolved document.
    pub fn resolved(mut self) -> Self {
        self.resolve();
        self
    }

    /// Structural equality of the content, ignoring `modification_time`.
    pub fn same_content(&self, other: &Self) -> bool {
        let Self {
            programs,
            networks,
            system,
            info,
            vm,
            nfs,
            routing,
            logging,
            sysctl,
            modification_time: _,
        } = self;

        *programs == other.programs
            && *networks == other.networks
            && *system == other.system
            && *info == other.info
            && *vm == other.vm
            && *nfs == other.nfs
            && *routing == other.routing
            && *logging == other.logging
            && *sysctl == other.sysctl
    }

    /// Set the modification time.
    pub fn with_modification_time(mut self, time: DateTime<Utc>) -> Self {
        self.modification_time = Some(time);
        self
    }

    /// True when no marker remains anywhere in the document.
    pub fn is_resolved(&self) -> bool {
        fn plain(list: &[ListEntry]) -> bool {
            list.iter().all(ListEntry::is_plain)
        }

        self.networks
            .iter()
            .all(|n| plain(&n.udp) && plain(&n.tcp) && plain(&n.http) && plain(&n.https))
            && plain(&self.system.dns)
            && plain(&self.system.ntp)
            && self
                .system
                .kernel_args
                .split_whitespace()
                .all(|t| !t.starts_with('!') && !t.starts_with('~'))
    }
}
