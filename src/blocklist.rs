//! Hosts and addresses that authority rules can never admit by pattern.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::Policy;

/// Metadata hostnames, matched exactly or as a parent domain.
const BLOCKED_HOSTNAMES: &[&str] = &[
    "metadata.google.internal",
    "metadata.goog",
    "metadata.azure.internal",
    "instance-data",
];

/// Why an IP-literal host was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddressBlock {
    Unspecified,
    Loopback,
    LinkLocal,
    Metadata,
    Private,
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressBlock::Unspecified => "unspecified address",
            AddressBlock::Loopback => "loopback address",
            AddressBlock::LinkLocal => "link-local address",
            AddressBlock::Metadata => "cloud metadata endpoint",
            AddressBlock::Private => "private address",
        })
    }
}

/// The blocklist entry covering `host`, if any. `host` must be lowercase.
pub(crate) fn blocked_hostname(host: &str) -> Option<&'static str> {
    BLOCKED_HOSTNAMES.iter().copied().find(|&blocked| {
        host == blocked
            || host
                .strip_suffix(blocked)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

pub(crate) fn blocked_address(ip: IpAddr, policy: Policy) -> Option<AddressBlock> {
    match ip {
        IpAddr::V4(v4) => blocked_v4(v4, policy),
        IpAddr::V6(v6) => blocked_v6(v6, policy),
    }
}

fn blocked_v4(ip: Ipv4Addr, policy: Policy) -> Option<AddressBlock> {
    if ip.is_unspecified() {
        Some(AddressBlock::Unspecified)
    } else if ip.is_loopback() {
        Some(AddressBlock::Loopback)
    } else if is_metadata_v4(ip) {
        Some(AddressBlock::Metadata)
    } else if ip.is_link_local() {
        Some(AddressBlock::LinkLocal)
    } else if policy == Policy::PublicOnly && ip.is_private() {
        Some(AddressBlock::Private)
    } else {
        None
    }
}

fn blocked_v6(ip: Ipv6Addr, policy: Policy) -> Option<AddressBlock> {
    if ip.is_unspecified() {
        return Some(AddressBlock::Unspecified);
    }
    if ip.is_loopback() {
        return Some(AddressBlock::Loopback);
    }
    if let Some(v4) = embedded_v4(ip) {
        return blocked_v4(v4, policy);
    }

    let first = ip.segments()[0];
    if ip == AWS_METADATA_V6 {
        Some(AddressBlock::Metadata)
    } else if first & 0xffc0 == 0xfe80 {
        Some(AddressBlock::LinkLocal)
    } else if policy == Policy::PublicOnly && first & 0xfe00 == 0xfc00 {
        Some(AddressBlock::Private)
    } else {
        None
    }
}

/// fd00:ec2::254
const AWS_METADATA_V6: Ipv6Addr = Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254);

fn is_metadata_v4(ip: Ipv4Addr) -> bool {
    ip == Ipv4Addr::new(169, 254, 169, 254) || ip == Ipv4Addr::new(100, 100, 100, 200)
}

/// IPv4-mapped (`::ffff:a.b.c.d`) or IPv4-compatible (`::a.b.c.d`) address.
fn embedded_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }
    let s = ip.segments();
    if s[..6] == [0; 6] && (s[6] != 0 || s[7] > 1) {
        let [a, b] = s[6].to_be_bytes();
        let [c, d] = s[7].to_be_bytes();
        return Some(Ipv4Addr::new(a, b, c, d));
    }
    None
}
