use crate::canonical::Canonicalizer;
use crate::entity::{Entity, FromPayload};
use crate::error::{PayloadError, ResolveError};
use crate::payload::{PayloadReader, TYPE_KEY};
use crate::referencer::SharedReferencer;
use crate::resolution::EntityCore;
use serde_json::{json, Value};
use std::fmt;
use zeroguard_validators::{check_valid_network_prefix, IpNetwork};

/// A CIDR network prefix. Has no lazy fields.
#[derive(Debug)]
pub struct NetworkPrefix {
    core: EntityCore,
    prefix: IpNetwork,
}

impl NetworkPrefix {
    pub fn prefix(&self) -> &IpNetwork {
        &self.prefix
    }
}

impl Entity for NetworkPrefix {
    fn type_tag(&self) -> &'static str {
        Self::TYPE
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn to_canonical(&self, _cx: &mut Canonicalizer) -> Result<Value, ResolveError> {
        Ok(json!({
            TYPE_KEY: Self::TYPE,
            "prefix": self.prefix.to_string(),
        }))
    }

    fn render(&self) -> String {
        self.summary()
    }

    fn summary(&self) -> String {
        format!("NetworkPrefix({})", self.prefix)
    }

    fn natural_key(&self) -> Option<String> {
        Some(self.prefix.to_string())
    }
}

impl FromPayload for NetworkPrefix {
    const TYPE: &'static str = "netpref";

    fn from_payload(data: &Value, referencer: &SharedReferencer) -> Result<Self, PayloadError> {
        let reader = PayloadReader::open(Self::TYPE, data, referencer)?;
        let raw = reader.required_str("prefix")?;
        let prefix = check_valid_network_prefix(raw).map_err(|source| PayloadError::InvalidField {
            type_tag: Self::TYPE,
            field: "prefix".to_string(),
            source,
        })?;
        Ok(Self {
            core: EntityCore::new(referencer),
            prefix,
        })
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referencer::InMemoryReferencer;

    #[test]
    fn from_payload() {
        let r: SharedReferencer = InMemoryReferencer::shared();
        let p = NetworkPrefix::from_payload(&json!({"type": "netpref", "prefix": "8.8.0.0/16"}), &r)
            .unwrap();
        assert_eq!(p.prefix().to_string(), "8.8.0.0/16");
        assert_eq!(p.to_string(), "NetworkPrefix(8.8.0.0/16)");
        assert!(p.core().field_names().is_empty());
    }

    #[test]
    fn rejects_host_bits_and_wrong_tag() {
        let r: SharedReferencer = InMemoryReferencer::shared();
        let err = NetworkPrefix::from_payload(&json!({"type": "netpref", "prefix": "8.8.8.8/16"}), &r)
            .unwrap_err();
        assert!(matches!(err, PayloadError::InvalidField { .. }));
        let err = NetworkPrefix::from_payload(&json!({"type": "ipv4", "prefix": "8.8.0.0/16"}), &r)
            .unwrap_err();
        assert!(matches!(err, PayloadError::TypeMismatch { .. }));
        let err = NetworkPrefix::from_payload(&json!({"type": "netpref"}), &r).unwrap_err();
        assert!(matches!(err, PayloadError::MalformedPayload { .. }));
    }

    #[test]
    fn canonical() {
        let r: SharedReferencer = InMemoryReferencer::shared();
        let p = NetworkPrefix::from_payload(&json!({"type": "netpref", "prefix": "2001:db8::/32"}), &r)
            .unwrap();
        let value = (&p as &dyn Entity).canonical_form().unwrap();
        assert_eq!(value, json!({"type": "netpref", "prefix": "2001:db8::/32"}));
    }
}
