//! Interface normalization

use crate::document::NetworkInterface;
use crate::ports::resolve_ports;

/// `ip` spellings that switch an interface off.
const DISABLED_SPELLINGS: &[&str] = &["", "!", "disabled"];

const DHCP: &str = "dhcp";

/// How an interface obtains its address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    Disabled,
    Dhcp,
    Static,
}

impl NetworkInterface {
    pub fn mode(&self) -> InterfaceMode {
        if DISABLED_SPELLINGS.contains(&self.ip.as_str()) {
            InterfaceMode::Disabled
        } else if self.ip == DHCP {
            InterfaceMode::Dhcp
        } else {
            InterfaceMode::Static
        }
    }
}

/// Derive the effective settings of one interface.
///
/// A disabled interface loses its addressing and every port list. A DHCP
/// interface loses mask and gateway but keeps its ports.
pub fn normalize_interface(nic: &mut NetworkInterface) {
    match nic.mode() {
        InterfaceMode::Disabled => {
            nic.ip.clear();
            nic.mask.clear();
            nic.gateway.clear();
            nic.udp.clear();
            nic.tcp.clear();
            nic.http.clear();
            nic.https.clear();
        }
        InterfaceMode::Dhcp => {
            nic.mask.clear();
            nic.gateway.clear();
        }
        InterfaceMode::Static => {}
    }
}

/// Resolve ports and normalize every interface, in place.
pub fn normalize_interfaces(nics: &mut [NetworkInterface]) {
    for nic in nics.iter_mut() {
        resolve_ports(nic);
        normalize_interface(nic);
    }
}
