use chrono::{DateTime, Utc};
use crate::error::PayloadError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use zeroguard_validators::check_valid_unix_time;

/// One reputation list entry of an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub name: String,
    /// Whether the address is currently listed.
    pub current: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub first_seen: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_seen: DateTime<Utc>,
}

impl ReputationEntry {
    /// Parse one entry. Timestamps may be integers or integer strings.
    pub fn from_payload(type_tag: &'static str, data: &Value) -> Result<Self, PayloadError> {
        let field = |name: &str| {
            data.get(name).ok_or_else(|| {
                PayloadError::malformed(type_tag, format!("reputation entry missing {}", name))
            })
        };
        let name = field("name")?
            .as_str()
            .ok_or_else(|| PayloadError::malformed(type_tag, "reputation name must be a string"))?
            .to_string();
        let current = field("current")?.as_bool().ok_or_else(|| {
            PayloadError::malformed(type_tag, "reputation current flag must be a boolean")
        })?;
        let timestamp = |name: &str| -> Result<DateTime<Utc>, PayloadError> {
            check_valid_unix_time(field(name)?).map_err(|source| PayloadError::InvalidField {
                type_tag,
                field: format!("reputation.{}", name),
                source,
            })
        };
        Ok(Self {
            name,
            current,
            first_seen: timestamp("first_seen")?,
            last_seen: timestamp("last_seen")?,
        })
    }

    pub fn to_canonical(&self) -> Value {
        json!({
            "name": self.name,
            "current": self.current,
            "first_seen": self.first_seen.timestamp(),
            "last_seen": self.last_seen.timestamp(),
        })
    }
}

impl fmt::Display for ReputationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (current={}, first_seen={}, last_seen={})",
            self.name,
            self.current,
            self.first_seen.to_rfc3339(),
            self.last_seen.to_rfc3339()
        )
    }
}
