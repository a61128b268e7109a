//! Concrete entity types carried by API payloads.

pub mod ip_address;
pub mod network_prefix;
pub mod reputation;
pub mod subdomain;

pub use ip_address::{IpAddressEntity, IpFamily, Ipv4Address, Ipv6Address, V4, V6};
pub use network_prefix::NetworkPrefix;
pub use reputation::ReputationEntry;
pub use subdomain::{AddressRole, Subdomain};
