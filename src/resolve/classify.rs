//! Address classification

use crate::database::AddressFamily;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Result of classifying an input string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
    Invalid,
}

impl AddressClass {
    pub fn ip(&self) -> Option<IpAddr> {
        match *self {
            AddressClass::V4(v4) => Some(IpAddr::V4(v4)),
            AddressClass::V6(v6) => Some(IpAddr::V6(v6)),
            AddressClass::Invalid => None,
        }
    }

    pub fn family(&self) -> Option<AddressFamily> {
        match self {
            AddressClass::V4(_) => Some(AddressFamily::V4),
            AddressClass::V6(_) => Some(AddressFamily::V6),
            AddressClass::Invalid => None,
        }
    }
}

/// Classify a string as dotted-decimal IPv4, colon-hex IPv6, or neither
///
/// Input is taken verbatim: surrounding whitespace, hostnames, zone ids and
/// CIDR suffixes are all invalid.
pub fn classify(input: &str) -> AddressClass {
    if let Ok(v4) = input.parse::<Ipv4Addr>() {
        return AddressClass::V4(v4);
    }
    if let Ok(v6) = input.parse::<Ipv6Addr>() {
        return AddressClass::V6(v6);
    }
    AddressClass::Invalid
}
