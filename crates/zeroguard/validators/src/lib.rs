#![deny(unsafe_code)]
//! # zeroguard-validators
//!
//! Scalar validation and conversion for the primitive fields of ZeroGuard
//! API payloads. Every `check_valid_*` function returns the converted native
//! value or a typed [`ValidationError`]; every `is_valid_*` counterpart
//! answers the same question as a `bool`.
//!
//! - [`check_valid_ip_address`] - IPv4/IPv6 literal → [`std::net::IpAddr`]
//! - [`check_valid_network_prefix`] - strict CIDR → [`IpNetwork`]
//! - [`check_valid_domain`] - internet domain (IDNA aware) → ASCII `String`
//! - [`check_valid_unix_time`] - Unix seconds → `DateTime<Utc>`

pub mod domains;
pub mod error;
pub mod networks;
pub mod time;

pub use domains::{check_valid_domain, is_valid_domain};
pub use error::{AddressFamily, ValidationError};
pub use networks::{
    check_valid_ip_address, check_valid_ipv4_address, check_valid_ipv4_network,
    check_valid_ipv6_address, check_valid_ipv6_network, check_valid_network_prefix,
    is_valid_ip_address, is_valid_network_prefix, IpNetwork,
};
pub use time::{check_valid_unix_time, check_valid_unix_secs, is_valid_unix_time};
