use crate::canonical::Canonicalizer;
use crate::entity::{Entity, FromPayload};
use crate::error::{PayloadError, ResolveError};
use crate::payload::{PayloadReader, TYPE_KEY};
use crate::referencer::SharedReferencer;
use crate::render::{lpad, render_slot};
use crate::resolution::{expect_entity, expect_entity_list, EntityCore};
use serde_json::{json, Value};
use std::fmt;
use std::marker::PhantomData;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use super::network_prefix::NetworkPrefix;
use super::reputation::ReputationEntry;
use zeroguard_validators::{check_valid_ipv4_address, check_valid_ipv6_address, ValidationError};

const CLOSEST_PREFIX: &str = "closest_prefix";
const PREFIXES: &str = "prefixes";

/// Address family of an [`IpAddressEntity`].
pub trait IpFamily: 'static {
    /// Payload type tag.
    const TYPE: &'static str;
    /// Rendered type name.
    const NAME: &'static str;
    type Addr: Copy + fmt::Debug + fmt::Display + 'static;

    fn parse(value: &str) -> Result<Self::Addr, ValidationError>;
}

#[derive(Debug)]
pub enum V4 {}

#[derive(Debug)]
pub enum V6 {}

impl IpFamily for V4 {
    const TYPE: &'static str = "ipv4";
    const NAME: &'static str = "IPv4Address";
    type Addr = Ipv4Addr;

    fn parse(value: &str) -> Result<Ipv4Addr, ValidationError> {
        check_valid_ipv4_address(value)
    }
}

impl IpFamily for V6 {
    const TYPE: &'static str = "ipv6";
    const NAME: &'static str = "IPv6Address";
    type Addr = Ipv6Addr;

    fn parse(value: &str) -> Result<Ipv6Addr, ValidationError> {
        check_valid_ipv6_address(value)
    }
}

/// An IP address with its containing network prefixes and reputation.
///
/// `closest_prefix` and `prefixes` are lazy: they may arrive as references
/// and are dereferenced on first access.
pub struct IpAddressEntity<F: IpFamily> {
    core: EntityCore,
    address: F::Addr,
    reputation: Vec<ReputationEntry>,
    family: PhantomData<F>,
}

pub type Ipv4Address = IpAddressEntity<V4>;
pub type Ipv6Address = IpAddressEntity<V6>;

impl<F: IpFamily> IpAddressEntity<F> {
    pub fn address(&self) -> F::Addr {
        self.address
    }

    pub fn reputation(&self) -> &[ReputationEntry] {
        &self.reputation
    }

    /// The most specific known prefix containing this address.
    pub fn closest_prefix(&self) -> Result<Rc<NetworkPrefix>, ResolveError> {
        let slot = self.core.resolve(self, CLOSEST_PREFIX)?;
        expect_entity::<NetworkPrefix>(CLOSEST_PREFIX, slot)
    }

    /// Every known prefix containing this address.
    pub fn prefixes(&self) -> Result<Vec<Rc<NetworkPrefix>>, ResolveError> {
        let slot = self.core.resolve(self, PREFIXES)?;
        expect_entity_list::<NetworkPrefix>(PREFIXES, slot)
    }

    fn peek(&self, field: &str) -> String {
        self.core
            .peek(field)
            .map(|slot| render_slot(&slot))
            .unwrap_or_default()
    }
}

impl<F: IpFamily> Entity for IpAddressEntity<F> {
    fn type_tag(&self) -> &'static str {
        F::TYPE
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn to_canonical(&self, cx: &mut Canonicalizer) -> Result<Value, ResolveError> {
        let closest_prefix = self.core.resolve(self, CLOSEST_PREFIX)?;
        let prefixes = self.core.resolve(self, PREFIXES)?;
        let reputation: Vec<Value> = self
            .reputation
            .iter()
            .map(ReputationEntry::to_canonical)
            .collect();
        Ok(json!({
            TYPE_KEY: F::TYPE,
            "address": self.address.to_string(),
            CLOSEST_PREFIX: cx.slot(&closest_prefix)?,
            PREFIXES: cx.slot(&prefixes)?,
            "reputation": reputation,
        }))
    }

    fn render(&self) -> String {
        let mut lines = vec![
            format!("{}(", F::NAME),
            format!("  address={}", self.address),
            format!("  closest_prefix={}", self.peek(CLOSEST_PREFIX)),
            format!("  prefixes={}", self.peek(PREFIXES)),
        ];
        if self.reputation.is_empty() {
            lines.push("  reputation=[]".to_string());
        } else {
            lines.push("  reputation=[".to_string());
            for entry in &self.reputation {
                lines.push(lpad(&entry.to_string(), 4));
            }
            lines.push("  ]".to_string());
        }
        lines.push(")".to_string());
        lines.join("\n")
    }

    fn summary(&self) -> String {
        format!("{}({})", F::NAME, self.address)
    }

    fn natural_key(&self) -> Option<String> {
        Some(self.address.to_string())
    }
}

impl<F: IpFamily> FromPayload for IpAddressEntity<F> {
    const TYPE: &'static str = F::TYPE;

    fn from_payload(data: &Value, referencer: &SharedReferencer) -> Result<Self, PayloadError> {
        let reader = PayloadReader::open(F::TYPE, data, referencer)?;
        let address = F::parse(reader.required_str("address")?).map_err(|source| {
            PayloadError::InvalidField {
                type_tag: F::TYPE,
                field: "address".to_string(),
                source,
            }
        })?;
        let closest_prefix = reader.slot::<NetworkPrefix>(CLOSEST_PREFIX)?;
        let prefixes = reader.slot_list::<NetworkPrefix>(PREFIXES)?;
        let reputation = match reader.optional("reputation") {
            None => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|entry| ReputationEntry::from_payload(F::TYPE, entry))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(PayloadError::malformed(F::TYPE, "reputation is not a list")),
        };

        Ok(Self {
            core: EntityCore::new(referencer)
                .with_field(CLOSEST_PREFIX, closest_prefix)
                .with_field(PREFIXES, prefixes),
            address,
            reputation,
            family: PhantomData,
        })
    }
}

impl<F: IpFamily> fmt::Debug for IpAddressEntity<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(F::NAME)
            .field("address", &self.address)
            .field("reputation", &self.reputation)
            .field("core", &self.core)
            .finish()
    }
}

impl<F: IpFamily> fmt::Display for IpAddressEntity<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
