//! IP address and CIDR network prefix validation.

use crate::error::{AddressFamily, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Check whether a value is a valid IPv4 or IPv6 address literal.
pub fn check_valid_ip_address(value: &str) -> Result<IpAddr, ValidationError> {
    value
        .parse::<IpAddr>()
        .map_err(|_| ValidationError::InvalidIpAddress(value.to_string()))
}

/// Like [`check_valid_ip_address`], but the address must be IPv4.
pub fn check_valid_ipv4_address(value: &str) -> Result<Ipv4Addr, ValidationError> {
    match check_valid_ip_address(value)? {
        IpAddr::V4(addr) => Ok(addr),
        IpAddr::V6(_) => Err(ValidationError::WrongFamily {
            value: value.to_string(),
            expected: AddressFamily::V4,
        }),
    }
}

/// Like [`check_valid_ip_address`], but the address must be IPv6.
pub fn check_valid_ipv6_address(value: &str) -> Result<Ipv6Addr, ValidationError> {
    match check_valid_ip_address(value)? {
        IpAddr::V6(addr) => Ok(addr),
        IpAddr::V4(_) => Err(ValidationError::WrongFamily {
            value: value.to_string(),
            expected: AddressFamily::V6,
        }),
    }
}

pub fn is_valid_ip_address(value: &str) -> bool {
    check_valid_ip_address(value).is_ok()
}

/// An IPv4 or IPv6 network in CIDR notation.
///
/// Always strict: the address part has no bits set beyond the prefix length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IpNetwork {
    V4 { network: Ipv4Addr, prefix_len: u8 },
    V6 { network: Ipv6Addr, prefix_len: u8 },
}

impl IpNetwork {
    pub fn network(&self) -> IpAddr {
        match self {
            Self::V4 { network, .. } => IpAddr::V4(*network),
            Self::V6 { network, .. } => IpAddr::V6(*network),
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            Self::V4 { prefix_len, .. } | Self::V6 { prefix_len, .. } => *prefix_len,
        }
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            Self::V4 { .. } => AddressFamily::V4,
            Self::V6 { .. } => AddressFamily::V6,
        }
    }

    /// Whether `addr` falls inside this network. Addresses of the other
    /// family are never contained.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self, addr) {
            (Self::V4 { network, prefix_len }, IpAddr::V4(a)) => {
                let mask = v4_mask(*prefix_len);
                u32::from(*a) & mask == u32::from(*network)
            }
            (Self::V6 { network, prefix_len }, IpAddr::V6(a)) => {
                let mask = v6_mask(*prefix_len);
                u128::from(*a) & mask == u128::from(*network)
            }
            _ => false,
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len())
    }
}

impl FromStr for IpNetwork {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_valid_network_prefix(s)
    }
}

impl Serialize for IpNetwork {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpNetwork {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        check_valid_network_prefix(&s).map_err(serde::de::Error::custom)
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

fn v6_mask(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - u32::from(n)),
    }
}

/// Check whether a value is a valid network prefix (IPv4/IPv6 CIDR).
///
/// A bare address is accepted as a full-length host network. The prefix
/// length must be plain decimal digits and the address must carry no host
/// bits, so `8.8.0.0/8` is rejected.
pub fn check_valid_network_prefix(value: &str) -> Result<IpNetwork, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidNetworkPrefix {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (addr_part, len_part) = match value.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (value, None),
    };

    let addr: IpAddr = addr_part
        .parse()
        .map_err(|_| invalid("address part is not an IP address"))?;
    let max_len: u32 = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };

    let prefix_len = match len_part {
        None => max_len,
        Some(len) => {
            if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("prefix length is not a decimal number"));
            }
            let n: u32 = len
                .parse()
                .map_err(|_| invalid("prefix length out of range"))?;
            if n > max_len {
                return Err(invalid("prefix length out of range"));
            }
            n
        }
    };
    // Bounded by max_len above.
    let prefix_len = prefix_len as u8;

    match addr {
        IpAddr::V4(network) => {
            if u32::from(network) & !v4_mask(prefix_len) != 0 {
                return Err(invalid("host bits set"));
            }
            Ok(IpNetwork::V4 {
                network,
                prefix_len,
            })
        }
        IpAddr::V6(network) => {
            if u128::from(network) & !v6_mask(prefix_len) != 0 {
                return Err(invalid("host bits set"));
            }
            Ok(IpNetwork::V6 {
                network,
                prefix_len,
            })
        }
    }
}

/// Like [`check_valid_network_prefix`], but the network must be IPv4.
pub fn check_valid_ipv4_network(value: &str) -> Result<IpNetwork, ValidationError> {
    let net = check_valid_network_prefix(value)?;
    if net.family() != AddressFamily::V4 {
        return Err(ValidationError::WrongFamily {
            value: value.to_string(),
            expected: AddressFamily::V4,
        });
    }
    Ok(net)
}

/// Like [`check_valid_network_prefix`], but the network must be IPv6.
pub fn check_valid_ipv6_network(value: &str) -> Result<IpNetwork, ValidationError> {
    let net = check_valid_network_prefix(value)?;
    if net.family() != AddressFamily::V6 {
        return Err(ValidationError::WrongFamily {
            value: value.to_string(),
            expected: AddressFamily::V6,
        });
    }
    Ok(net)
}

pub fn is_valid_network_prefix(value: &str) -> bool {
    check_valid_network_prefix(value).is_ok()
}
