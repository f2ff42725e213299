//! Document merge
//!
//! Combines a base document with an overlay into a new document:
//! - Scalars: the overlay wins when it is non-empty / non-zero
//! - Record lists (programs, nfs, routes, logging): every base record, then
//!   the overlay records the base does not already hold
//! - String lists: base then overlay, so overlay markers can cancel base
//!   entries, then resolved
//! - Interfaces: paired by position, extras appended
//! - `sysctl`: per-key union, overlay wins
//!
//! The modification time of the result is inherited from whichever input
//! already has the merged content, or set to now when neither does.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::document::{
    ConfigDocument, NetworkInterface, PackageInfo, SystemSettings, VmSettings,
};
use crate::list::{merge_lists, merge_lists_dedup, merge_maps, merge_records, resolve_tokens};
use crate::size::ByteSize;

/// Scalar override: `overlay` wins when it carries a value.
trait Overlay {
    fn overlay(&self, other: &Self) -> Self;
}

impl Overlay for String {
    fn overlay(&self, other: &Self) -> Self {
        let chosen = if other.is_empty() { self } else { other };
        chosen.clone()
    }
}

impl Overlay for u32 {
    fn overlay(&self, other: &Self) -> Self {
        if *other == 0 { *self } else { *other }
    }
}

impl Overlay for u64 {
    fn overlay(&self, other: &Self) -> Self {
        if *other == 0 { *self } else { *other }
    }
}

impl Overlay for bool {
    fn overlay(&self, other: &Self) -> Self {
        *self || *other
    }
}

impl Overlay for ByteSize {
    fn overlay(&self, other: &Self) -> Self {
        if other.is_zero() { *self } else { *other }
    }
}

impl<T: Clone> Overlay for Option<T> {
    fn overlay(&self, other: &Self) -> Self {
        other.clone().or_else(|| self.clone())
    }
}

fn merge_interface(base: &NetworkInterface, overlay: &NetworkInterface) -> NetworkInterface {
    NetworkInterface {
        ip: base.ip.overlay(&overlay.ip),
        mask: base.mask.overlay(&overlay.mask),
        gateway: base.gateway.overlay(&overlay.gateway),
        udp: merge_lists(&[&base.udp, &overlay.udp]),
        tcp: merge_lists(&[&base.tcp, &overlay.tcp]),
        http: merge_lists(&[&base.http, &overlay.http]),
        https: merge_lists(&[&base.https, &overlay.https]),
        mtu: base.mtu.overlay(&overlay.mtu),
        disable_tso: base.disable_tso.overlay(&overlay.disable_tso),
        tcpdump: base.tcpdump.overlay(&overlay.tcpdump),
    }
}

/// Pair interfaces by position; whichever side is longer contributes its
/// remaining interfaces unchanged.
fn merge_networks(base: &[NetworkInterface], overlay: &[NetworkInterface]) -> Vec<NetworkInterface> {
    let mut out: Vec<NetworkInterface> = base
        .iter()
        .enumerate()
        .map(|(i, nic)| match overlay.get(i) {
            Some(over) => merge_interface(nic, over),
            None => nic.clone(),
        })
        .collect();
    out.extend(overlay.iter().skip(base.len()).cloned());
    out
}

fn merge_system(base: &SystemSettings, overlay: &SystemSettings) -> SystemSettings {
    SystemSettings {
        dns: merge_lists_dedup(&[&base.dns, &overlay.dns]),
        ntp: merge_lists_dedup(&[&base.ntp, &overlay.ntp]),
        hostname: base.hostname.overlay(&overlay.hostname),
        max_fds: base.max_fds.overlay(&overlay.max_fds),
        stdout_mode: base.stdout_mode.overlay(&overlay.stdout_mode),
        kernel_args: resolve_tokens(&[base.kernel_args.as_str(), overlay.kernel_args.as_str()]),
        filesystem: base.filesystem.overlay(&overlay.filesystem),
        user: base.user.overlay(&overlay.user),
    }
}

fn merge_info(base: &PackageInfo, overlay: &PackageInfo) -> PackageInfo {
    PackageInfo {
        name: base.name.overlay(&overlay.name),
        author: base.author.overlay(&overlay.author),
        summary: base.summary.overlay(&overlay.summary),
        description: base.description.overlay(&overlay.description),
        url: base.url.overlay(&overlay.url),
        date: base.date.overlay(&overlay.date),
        version: base.version.overlay(&overlay.version),
    }
}

fn merge_vm(base: &VmSettings, overlay: &VmSettings) -> VmSettings {
    VmSettings {
        cpus: base.cpus.overlay(&overlay.cpus),
        ram: base.ram.overlay(&overlay.ram),
        inodes: base.inodes.overlay(&overlay.inodes),
        kernel: base.kernel.overlay(&overlay.kernel),
        disk_size: base.disk_size.overlay(&overlay.disk_size),
    }
}

/// Merge `overlay` on top of `base`, stamping changed content with the
/// current time.
pub fn merge(base: &ConfigDocument, overlay: &ConfigDocument) -> ConfigDocument {
    merge_at(base, overlay, Utc::now())
}

/// Merge `overlay` on top of `base`; `now` is used when the merged content
/// differs from both inputs.
pub fn merge_at(
    base: &ConfigDocument,
    overlay: &ConfigDocument,
    now: DateTime<Utc>,
) -> ConfigDocument {
    let mut merged = ConfigDocument {
        programs: merge_records(&base.programs, &overlay.programs),
        networks: merge_networks(&base.networks, &overlay.networks),
        system: merge_system(&base.system, &overlay.system),
        info: merge_info(&base.info, &overlay.info),
        vm: merge_vm(&base.vm, &overlay.vm),
        nfs: merge_records(&base.nfs, &overlay.nfs),
        routing: merge_records(&base.routing, &overlay.routing),
        logging: merge_records(&base.logging, &overlay.logging),
        sysctl: merge_maps(&[&base.sysctl, &overlay.sysctl]),
        modification_time: None,
    };
    merged.resolve();

    merged.modification_time = if merged.same_content(overlay) {
        debug!("merged content matches overlay, keeping its modification time");
        overlay.modification_time
    } else if merged.same_content(base) {
        debug!("merged content matches base, keeping its modification time");
        base.modification_time
    } else {
        debug!(%now, "merged content is new");
        Some(now)
    };

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Privilege, Program, StdoutMode};
    use crate::entry::entries;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn program(binary: &str) -> Program {
        Program {
            binary: binary.into(),
            privilege: Some(Privilege::Root),
            ..Default::default()
        }
    }

    fn base() -> ConfigDocument {
        let mut doc = ConfigDocument::default();
        doc.programs.push(program("/bin/server"));
        doc.networks.push(NetworkInterface {
            ip: "10.0.0.2".into(),
            mask: "255.255.255.0".into(),
            gateway: "10.0.0.1".into(),
            tcp: entries(&["22", "8080"]),
            http: entries(&["8080"]),
            ..Default::default()
        });
        doc.system.hostname = "base".into();
        doc.system.dns = entries(&["8.8.8.8"]);
        doc.system.kernel_args = "console=ttyS0 quiet".into();
        doc.vm.cpus = 1;
        doc.vm.ram = ByteSize::mib(256);
        doc.sysctl.insert("net.core.somaxconn".into(), "128".into());
        doc.resolved().with_modification_time(t(100))
    }

    #[test]
    fn test_scalar_override() {
        let mut overlay = ConfigDocument::default();
        overlay.system.hostname = "override".into();
        overlay.vm.cpus = 4;

        let merged = merge_at(&base(), &overlay, t(500));

        assert_eq!(merged.system.hostname, "override");
        assert_eq!(merged.vm.cpus, 4);
        assert_eq!(merged.vm.ram, ByteSize::mib(256));
    }

    #[test]
    fn test_empty_overlay_keeps_base_scalars() {
        let merged = merge_at(&base(), &ConfigDocument::default(), t(500));
        assert_eq!(merged.system.hostname, "base");
        assert_eq!(merged.vm.cpus, 1);
    }

    #[test]
    fn test_enum_override() {
        let mut overlay = ConfigDocument::default();
        overlay.system.stdout_mode = Some(StdoutMode::Serial);
        let merged = merge_at(&base(), &overlay, t(500));
        assert_eq!(merged.system.stdout_mode, Some(StdoutMode::Serial));
    }

    #[test]
    fn test_overlay_negation_cancels_base_port() {
        let mut overlay = ConfigDocument::default();
        overlay.networks.push(NetworkInterface {
            tcp: entries(&["!8080", "443"]),
            ..Default::default()
        });

        let merged = merge_at(&base(), &overlay, t(500));
        let nic = &merged.networks[0];

        assert_eq!(nic.ip, "10.0.0.2");
        assert_eq!(nic.tcp, entries(&["22", "443"]));
        // TCP negation cascades into HTTP
        assert!(nic.http.is_empty());
    }

    #[test]
    fn test_extra_interfaces_appended() {
        let mut overlay = ConfigDocument::default();
        overlay.networks.push(NetworkInterface::default());
        overlay.networks.push(NetworkInterface {
            ip: "dhcp".into(),
            udp: entries(&["53"]),
            ..Default::default()
        });

        let merged = merge_at(&base(), &overlay, t(500));

        assert_eq!(merged.networks.len(), 2);
        assert_eq!(merged.networks[1].ip, "dhcp");
        assert_eq!(merged.networks[1].udp, entries(&["53"]));
    }

    #[test]
    fn test_overlay_disables_interface() {
        let mut overlay = ConfigDocument::default();
        overlay.networks.push(NetworkInterface {
            ip: "disabled".into(),
            ..Default::default()
        });

        let merged = merge_at(&base(), &overlay, t(500));
        let nic = &merged.networks[0];

        assert!(nic.ip.is_empty());
        assert!(nic.tcp.is_empty());
        assert!(nic.http.is_empty());
    }

    #[test]
    fn test_dhcp_base_clears_mask_without_overlay() {
        let mut a = ConfigDocument::default();
        a.networks.push(NetworkInterface {
            ip: "dhcp".into(),
            mask: "255.255.255.0".into(),
            ..Default::default()
        });

        let merged = merge_at(&a, &ConfigDocument::default(), t(500));
        assert_eq!(merged.networks[0].mask, "");
    }

    #[test]
    fn test_records_concatenated_without_duplicates() {
        let mut overlay = ConfigDocument::default();
        overlay.programs.push(program("/bin/server"));
        overlay.programs.push(program("/bin/sidecar"));

        let merged = merge_at(&base(), &overlay, t(500));
        let binaries: Vec<_> = merged.programs.iter().map(|p| p.binary.as_str()).collect();
        assert_eq!(binaries, vec!["/bin/server", "/bin/sidecar"]);
    }

    #[test]
    fn test_general_lists_retraction_and_dedup() {
        let mut overlay = ConfigDocument::default();
        overlay.system.dns = entries(&["~8.8.8.8", "1.1.1.1", "1.1.1.1"]);
        overlay.system.kernel_args = "~quiet loglevel=7".into();

        let merged = merge_at(&base(), &overlay, t(500));

        assert_eq!(merged.system.dns, entries(&["1.1.1.1"]));
        assert_eq!(merged.system.kernel_args, "console=ttyS0 loglevel=7");
    }

    #[test]
    fn test_sysctl_union_overlay_wins() {
        let mut overlay = ConfigDocument::default();
        overlay.sysctl = BTreeMap::from([
            ("net.core.somaxconn".to_string(), "1024".to_string()),
            ("vm.swappiness".to_string(), "10".to_string()),
        ]);

        let merged = merge_at(&base(), &overlay, t(500));

        assert_eq!(merged.sysctl.len(), 2);
        assert_eq!(merged.sysctl["net.core.somaxconn"], "1024");
    }

    #[test]
    fn test_merge_with_self_keeps_time() {
        let a = base();
        let merged = merge_at(&a, &a, t(500));
        assert_eq!(merged, a);
        assert_eq!(merged.modification_time, Some(t(100)));
    }

    #[test]
    fn test_time_from_overlay_when_result_equals_overlay() {
        let b = base().with_modification_time(t(200));
        let merged = merge_at(&ConfigDocument::default(), &b, t(500));
        assert_eq!(merged.modification_time, Some(t(200)));
    }

    #[test]
    fn test_time_from_base_when_overlay_changes_nothing() {
        let mut overlay = ConfigDocument::default();
        overlay.system.hostname = "base".into();
        overlay.modification_time = Some(t(300));

        let merged = merge_at(&base(), &overlay, t(500));
        assert_eq!(merged.modification_time, Some(t(100)));
    }

    #[test]
    fn test_time_is_now_when_content_changes() {
        let mut overlay = ConfigDocument::default();
        overlay.vm.cpus = 8;
        overlay.modification_time = Some(t(300));

        let merged = merge_at(&base(), &overlay, t(500));
        assert_eq!(merged.modification_time, Some(t(500)));
    }

    #[test]
    fn test_repeated_overlay_is_idempotent() {
        let mut overlay = ConfigDocument::default();
        overlay.system.dns = entries(&["~8.8.8.8", "9.9.9.9"]);
        overlay.networks.push(NetworkInterface {
            tcp: entries(&["!22", "443"]),
            ..Default::default()
        });
        overlay.programs.push(program("/bin/sidecar"));
        overlay.vm.cpus = 2;

        let once = merge_at(&base(), &overlay, t(500));
        let twice = merge_at(&once, &overlay, t(900));

        assert!(twice.same_content(&once));
        assert_eq!(twice.modification_time, Some(t(500)));
    }

    #[test]
    fn test_repeated_programs_survive_merge() {
        let mut doc = base();
        doc.programs.push(program("/bin/server"));
        assert_eq!(doc.programs.len(), 2);

        let with_self = merge_at(&doc, &doc, t(900));
        assert_eq!(with_self, doc);
        assert_eq!(with_self.modification_time, Some(t(100)));

        let with_empty = merge_at(&doc, &ConfigDocument::default(), t(900));
        assert_eq!(with_empty.programs.len(), 2);
        assert_eq!(with_empty.modification_time, Some(t(100)));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let a = base();
        let mut overlay = ConfigDocument::default();
        overlay.networks.push(NetworkInterface {
            tcp: entries(&["!22"]),
            ..Default::default()
        });
        let overlay_before = overlay.clone();

        let _ = merge_at(&a, &overlay, t(500));

        assert_eq!(a, base());
        assert_eq!(overlay, overlay_before);
    }

    fn arbitrary_document() -> impl Strategy<Value = ConfigDocument> {
        let marked = || prop::collection::vec("[!~]?[a-d]", 0..8);
        let ports = || prop::collection::vec("[!~]?[0-9]{1,2}", 0..8);
        let binaries = prop::collection::vec(prop::sample::select(vec!["/bin/a", "/bin/b"]), 0..4);
        (
            binaries,
            prop::sample::select(vec!["", "dhcp", "10.0.0.2"]),
            ports(),
            ports(),
            marked(),
            marked(),
            0u32..4,
        )
            .prop_map(|(binaries, ip, tcp, http, dns, flags, cpus)| {
                let mut doc = ConfigDocument::default();
                doc.programs = binaries.into_iter().map(program).collect();
                doc.networks.push(NetworkInterface {
                    ip: ip.into(),
                    mask: "255.255.255.0".into(),
                    tcp: entries(&tcp),
                    http: entries(&http),
                    ..Default::default()
                });
                doc.system.dns = entries(&dns);
                doc.system.kernel_args = flags.join(" ");
                doc.vm.cpus = cpus;
                doc.resolved().with_modification_time(t(100))
            })
    }

    proptest! {
        #[test]
        fn test_merge_with_self_changes_nothing(doc in arbitrary_document()) {
            let merged = merge_at(&doc, &doc, t(900));
            prop_assert_eq!(merged, doc);
        }
    }
}
