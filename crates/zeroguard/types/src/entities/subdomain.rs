use crate::canonical::Canonicalizer;
use crate::entity::{Entity, EntityRef, FromPayload};
use crate::error::{PayloadError, ResolveError};
use crate::payload::{PayloadReader, TYPE_KEY};
use crate::reference::Reference;
use crate::referencer::SharedReferencer;
use crate::render::render_slot;
use crate::resolution::{
    expect_derived, expect_entity_list, Derived, DerivedDefault, EntityCore, Slot,
};
use serde_json::{json, Map, Value};
use std::fmt;
use std::rc::Rc;
use super::ip_address::{Ipv4Address, Ipv6Address};
use zeroguard_validators::check_valid_domain;

const IPV4: &str = "ipv4";
const IPV6: &str = "ipv6";

/// Role an address plays for a subdomain, flagged on the edge pointing at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    /// Returned by a live DNS query made on the API side.
    Live,
    /// The address the subdomain pointed at most recently.
    Latest,
    /// The oldest known address.
    Oldest,
}

impl AddressRole {
    pub const ALL: [AddressRole; 3] = [Self::Live, Self::Latest, Self::Oldest];

    /// Edge field carrying this role.
    pub fn edge_flag(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Latest => "latest",
            Self::Oldest => "oldest",
        }
    }

    /// Name of the derived attribute holding the address of this role.
    pub fn attribute(self, family: &str) -> Option<&'static str> {
        let name = match (self, family) {
            (Self::Live, IPV4) => "live_ipv4",
            (Self::Latest, IPV4) => "latest_ipv4",
            (Self::Oldest, IPV4) => "oldest_ipv4",
            (Self::Live, IPV6) => "live_ipv6",
            (Self::Latest, IPV6) => "latest_ipv6",
            (Self::Oldest, IPV6) => "oldest_ipv6",
            _ => return None,
        };
        Some(name)
    }
}

/// Derived attributes in rendering order, with their master field.
const DERIVED: [(&str, &str); 6] = [
    ("live_ipv4", IPV4),
    ("live_ipv6", IPV6),
    ("latest_ipv4", IPV4),
    ("latest_ipv6", IPV6),
    ("oldest_ipv4", IPV4),
    ("oldest_ipv6", IPV6),
];

/// A subdomain and the addresses it resolved to.
///
/// `ipv4` and `ipv6` are lazy lists. The `live_*`, `latest_*` and `oldest_*`
/// attributes are derived: resolving an address list claims them from the
/// edge flags of its references.
#[derive(Debug)]
pub struct Subdomain {
    core: EntityCore,
    name: String,
}

impl Subdomain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ipv4(&self) -> Result<Vec<Rc<Ipv4Address>>, ResolveError> {
        let slot = self.core.resolve(self, IPV4)?;
        expect_entity_list::<Ipv4Address>(IPV4, slot)
    }

    pub fn ipv6(&self) -> Result<Vec<Rc<Ipv6Address>>, ResolveError> {
        let slot = self.core.resolve(self, IPV6)?;
        expect_entity_list::<Ipv6Address>(IPV6, slot)
    }

    pub fn live_ipv4(&self) -> Result<Option<Rc<Ipv4Address>>, ResolveError> {
        self.ipv4_role(AddressRole::Live)
    }

    pub fn latest_ipv4(&self) -> Result<Option<Rc<Ipv4Address>>, ResolveError> {
        self.ipv4_role(AddressRole::Latest)
    }

    pub fn oldest_ipv4(&self) -> Result<Option<Rc<Ipv4Address>>, ResolveError> {
        self.ipv4_role(AddressRole::Oldest)
    }

    pub fn live_ipv6(&self) -> Result<Option<Rc<Ipv6Address>>, ResolveError> {
        self.ipv6_role(AddressRole::Live)
    }

    pub fn latest_ipv6(&self) -> Result<Option<Rc<Ipv6Address>>, ResolveError> {
        self.ipv6_role(AddressRole::Latest)
    }

    pub fn oldest_ipv6(&self) -> Result<Option<Rc<Ipv6Address>>, ResolveError> {
        self.ipv6_role(AddressRole::Oldest)
    }

    /// Untyped derived lookup with an explicit default.
    pub fn address_with_role(
        &self,
        role: AddressRole,
        family: &str,
        default: DerivedDefault,
    ) -> Result<Option<EntityRef>, ResolveError> {
        let attribute = Self::role_attribute(role, family)?;
        self.core.resolve_derived(self, attribute, default)
    }

    fn role_attribute(role: AddressRole, family: &str) -> Result<&'static str, ResolveError> {
        role.attribute(family).ok_or_else(|| ResolveError::UnknownField {
            type_tag: Self::TYPE,
            field: format!("{}_{}", role.edge_flag(), family),
        })
    }

    fn typed_role<T: FromPayload>(
        &self,
        role: AddressRole,
        family: &str,
    ) -> Result<Option<Rc<T>>, ResolveError> {
        let attribute = Self::role_attribute(role, family)?;
        let value = self
            .core
            .resolve_derived(self, attribute, DerivedDefault::NoClaimant)?;
        expect_derived::<T>(attribute, value)
    }

    fn ipv4_role(&self, role: AddressRole) -> Result<Option<Rc<Ipv4Address>>, ResolveError> {
        self.typed_role::<Ipv4Address>(role, IPV4)
    }

    fn ipv6_role(&self, role: AddressRole) -> Result<Option<Rc<Ipv6Address>>, ResolveError> {
        self.typed_role::<Ipv6Address>(role, IPV6)
    }

    fn peek_derived(&self, name: &str) -> String {
        match self.core.peek_derived(name) {
            Some(Derived::Resolved(Some(entity))) => entity.summary(),
            Some(Derived::Resolved(None)) => "None".to_string(),
            _ => "<unresolved>".to_string(),
        }
    }
}

impl Entity for Subdomain {
    fn type_tag(&self) -> &'static str {
        Self::TYPE
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn reconcile(&self, edge: &Reference, target: &EntityRef) -> Result<(), ResolveError> {
        let family = target.type_tag();
        for role in AddressRole::ALL {
            if !edge.flag(role.edge_flag()) {
                continue;
            }
            // Only addresses fill roles; other targets are ignored.
            if let Some(attribute) = role.attribute(family) {
                self.core.claim(self, attribute, target)?;
            }
        }
        Ok(())
    }

    fn to_canonical(&self, cx: &mut Canonicalizer) -> Result<Value, ResolveError> {
        let mut object = Map::new();
        object.insert(TYPE_KEY.to_string(), json!(Self::TYPE));
        object.insert("name".to_string(), json!(self.name));
        for (attribute, _) in DERIVED {
            let value = self
                .core
                .resolve_derived(self, attribute, DerivedDefault::NoClaimant)?;
            object.insert(attribute.to_string(), cx.optional(value.as_ref())?);
        }
        for family in [IPV4, IPV6] {
            let slot = self.core.resolve(self, family)?;
            object.insert(family.to_string(), cx.slot(&slot)?);
        }
        Ok(Value::Object(object))
    }

    fn render(&self) -> String {
        let mut lines = vec!["Subdomain(".to_string(), format!("  name={}", self.name)];
        for (attribute, _) in DERIVED {
            lines.push(format!("  {}={}", attribute, self.peek_derived(attribute)));
        }
        for family in [IPV4, IPV6] {
            let body = self
                .core
                .peek(family)
                .map(|slot| render_slot(&slot))
                .unwrap_or_default();
            lines.push(format!("  {}={}", family, body.replace('\n', "\n  ")));
        }
        lines.push(")".to_string());
        lines.join("\n")
    }

    fn summary(&self) -> String {
        format!("Subdomain({})", self.name)
    }

    fn natural_key(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

impl FromPayload for Subdomain {
    const TYPE: &'static str = "subdomain";

    fn from_payload(data: &Value, referencer: &SharedReferencer) -> Result<Self, PayloadError> {
        let reader = PayloadReader::open(Self::TYPE, data, referencer)?;
        let name = check_valid_domain(reader.required_str("name")?).map_err(|source| {
            PayloadError::InvalidField {
                type_tag: Self::TYPE,
                field: "name".to_string(),
                source,
            }
        })?;

        let mut core = EntityCore::new(referencer)
            .with_field(IPV4, reader.slot_list::<Ipv4Address>(IPV4)?)
            .with_field(IPV6, reader.slot_list::<Ipv6Address>(IPV6)?);
        for (attribute, master) in DERIVED {
            let preset = if master == IPV4 {
                reader.optional_entity::<Ipv4Address>(attribute)?
            } else {
                reader.optional_entity::<Ipv6Address>(attribute)?
            };
            let value = match preset {
                Some(Slot::Entity(entity)) => Some(entity),
                Some(_) => {
                    return Err(PayloadError::malformed(
                        Self::TYPE,
                        format!("{} must be an inline object", attribute),
                    ))
                }
                None => None,
            };
            core = core.with_derived_value(attribute, master, value);
        }

        Ok(Self { core, name })
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
