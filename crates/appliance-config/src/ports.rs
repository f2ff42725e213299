//! Port list resolution
//!
//! Each interface carries four port lists. Resolving one of them sorts it,
//! drops empty and duplicate entries, and consumes every `!port` marker by
//! removing that port from the same list. Negating a TCP port also removes
//! it from the HTTP and HTTPS lists, which are served over TCP. The reverse
//! does not hold.

use std::mem;

use tracing::debug;

use crate::document::NetworkInterface;
use crate::entry::ListEntry;
use crate::list::sanitize;

/// The protocol a port list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
    Http,
    Https,
}

impl Protocol {
    /// Resolution order. TCP comes first so its cascade reaches the raw
    /// HTTP/HTTPS lists before they are resolved.
    pub const RESOLUTION_ORDER: [Protocol; 4] =
        [Protocol::Tcp, Protocol::Udp, Protocol::Http, Protocol::Https];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Protocols layered on top of this one.
    pub fn cascades_to(self) -> &'static [Protocol] {
        match self {
            Self::Tcp => &[Protocol::Http, Protocol::Https],
            _ => &[],
        }
    }

    pub fn ports_mut(self, nic: &mut NetworkInterface) -> &mut Vec<ListEntry> {
        match self {
            Self::Udp => &mut nic.udp,
            Self::Tcp => &mut nic.tcp,
            Self::Http => &mut nic.http,
            Self::Https => &mut nic.https,
        }
    }
}

/// Resolve one protocol's port list on `nic`, cascading TCP negations.
pub fn resolve_protocol(nic: &mut NetworkInterface, protocol: Protocol) {
    let mut list = sanitize(mem::take(protocol.ports_mut(nic)));
    list.sort_by_cached_key(ToString::to_string);
    list.retain(|entry| !entry.is_plain_value(""));
    list.dedup();

    let negated: Vec<String> = list
        .iter()
        .filter_map(|entry| match entry {
            ListEntry::Exclude(port) => Some(port.clone()),
            _ => None,
        })
        .collect();

    list.retain(|entry| matches!(entry, ListEntry::Plain(port) if !negated.contains(port)));

    if !negated.is_empty() {
        debug!(protocol = protocol.as_str(), negated = ?negated, "consumed port negations");
        for layered in protocol.cascades_to() {
            let ports = layered.ports_mut(nic);
            ports.retain(|entry| !negated.iter().any(|port| entry.is_plain_value(port)));
        }
    }

    *protocol.ports_mut(nic) = list;
}

/// Resolve all four port lists of `nic`.
pub fn resolve_ports(nic: &mut NetworkInterface) {
    for protocol in Protocol::RESOLUTION_ORDER {
        resolve_protocol(nic, protocol);
    }
}
