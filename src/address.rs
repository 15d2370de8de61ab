//! Host string classification.
//!
//! A requested identity is either an IP literal, which becomes an IP address
//! subject alternative name, or anything else, which is treated as a DNS name.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The address family of a host string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressClass {
    /// No preference; matches addresses of any family.
    #[default]
    Auto,
    Ipv4,
    Ipv6,
    /// Not an IP literal. Placed in a certificate as a DNS name.
    Unknown,
}

impl AddressClass {
    /// The family of an already parsed address.
    ///
    /// IPv4-mapped IPv6 addresses count as IPv4.
    pub fn of(ip: &IpAddr) -> Self {
        match narrow(*ip) {
            IpAddr::V4(_) => AddressClass::Ipv4,
            IpAddr::V6(_) => AddressClass::Ipv6,
        }
    }

    /// Whether `ip` belongs to this class. `Auto` matches everything.
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            AddressClass::Auto => true,
            AddressClass::Unknown => false,
            class => *class == AddressClass::of(ip),
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressClass::Auto => "auto",
            AddressClass::Ipv4 => "ipv4",
            AddressClass::Ipv6 => "ipv6",
            AddressClass::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

fn narrow(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

/// Parse an IP literal, returning it in its narrowest family.
///
/// Returns `None` for anything that is not a bare IPv4 or IPv6 literal,
/// including bracketed or zoned IPv6 forms and host:port strings.
pub fn parse_host(host: &str) -> Option<IpAddr> {
    if let Ok(v4) = host.parse::<Ipv4Addr>() {
        return Some(IpAddr::V4(v4));
    }
    host.parse::<Ipv6Addr>().ok().map(|v6| narrow(IpAddr::V6(v6)))
}

/// Classify a requested identity. Never fails: non-literals are `Unknown`.
pub fn classify(identity: &str) -> AddressClass {
    match parse_host(identity) {
        Some(ip) => AddressClass::of(&ip),
        None => AddressClass::Unknown,
    }
}
