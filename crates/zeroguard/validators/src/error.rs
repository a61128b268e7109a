use serde::{Deserialize, Serialize};
use std::fmt;

/// IP protocol family a value was expected to belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Errors from scalar validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid IP address: {0:?}")]
    InvalidIpAddress(String),
    #[error("invalid network prefix {value:?}: {reason}")]
    InvalidNetworkPrefix { value: String, reason: String },
    #[error("wrong address family for {value:?}: expected {expected}")]
    WrongFamily {
        value: String,
        expected: AddressFamily,
    },
    #[error("invalid domain {value:?}: {reason}")]
    InvalidDomain { value: String, reason: String },
    #[error("invalid unix timestamp {value}: {reason}")]
    InvalidUnixTime { value: String, reason: String },
}
