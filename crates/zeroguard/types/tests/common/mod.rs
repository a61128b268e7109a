#![allow(dead_code)]

use serde_json::{json, Value};
use std::rc::Rc;
use uuid::Uuid;
use zeroguard_types::{
    Canonicalizer, Decoder, DerivedDefault, Entity, EntityCore, EntityRef, FromPayload,
    InMemoryReferencer, PayloadError, Reference, ResolveError, SharedReferencer, Slot,
};

/// A fresh store plus its shared handle.
pub fn store() -> (Rc<InMemoryReferencer>, SharedReferencer) {
    let concrete = InMemoryReferencer::shared();
    let shared: SharedReferencer = concrete.clone();
    (concrete, shared)
}

pub fn decoder(shared: &SharedReferencer) -> Decoder {
    Decoder::new(Rc::clone(shared))
}

pub fn prefix(cidr: &str) -> Value {
    json!({"type": "netpref", "prefix": cidr})
}

pub fn ipv4(address: &str, closest_prefix: Value) -> Value {
    json!({"type": "ipv4", "address": address, "closest_prefix": closest_prefix})
}

pub fn ipv6(address: &str, closest_prefix: Value) -> Value {
    json!({"type": "ipv6", "address": address, "closest_prefix": closest_prefix})
}

pub fn subdomain(name: &str, ipv4: Value) -> Value {
    json!({"type": "subdomain", "name": name, "ipv4": ipv4})
}

/// Test entity with a keyed map of links and one derived attribute
/// (`primary`) that has no default.
#[derive(Debug)]
pub struct MockNode {
    core: EntityCore,
    id: Uuid,
}

impl MockNode {
    pub const LINKS: &'static str = "links";
    pub const PRIMARY: &'static str = "primary";

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn primary(&self) -> Result<Option<EntityRef>, ResolveError> {
        self.core
            .resolve_derived(self, Self::PRIMARY, DerivedDefault::Required)
    }
}

impl Entity for MockNode {
    fn type_tag(&self) -> &'static str {
        Self::TYPE
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn reconcile(&self, edge: &Reference, target: &EntityRef) -> Result<(), ResolveError> {
        if edge.flag("primary") {
            self.core.claim(self, Self::PRIMARY, target)?;
        }
        Ok(())
    }

    fn to_canonical(&self, cx: &mut Canonicalizer) -> Result<Value, ResolveError> {
        let links = self.core.resolve(self, Self::LINKS)?;
        Ok(json!({
            "type": Self::TYPE,
            "id": self.id.to_string(),
            "links": cx.slot(&links)?,
        }))
    }

    fn render(&self) -> String {
        self.summary()
    }

    fn summary(&self) -> String {
        format!("MockNode({})", self.id)
    }
}

impl FromPayload for MockNode {
    const TYPE: &'static str = "mock";

    fn from_payload(data: &Value, referencer: &SharedReferencer) -> Result<Self, PayloadError> {
        let id = match data.get("id").and_then(Value::as_str) {
            Some(raw) => Uuid::parse_str(raw).map_err(|e| PayloadError::MalformedPayload {
                type_tag: Self::TYPE,
                reason: e.to_string(),
            })?,
            None => Uuid::new_v4(),
        };
        let mut links = indexmap::IndexMap::new();
        if let Some(map) = data.get("links").and_then(Value::as_object) {
            for (key, value) in map {
                let marker = value.as_object().ok_or_else(|| PayloadError::MalformedPayload {
                    type_tag: Self::TYPE,
                    reason: format!("link {} is not a marker", key),
                })?;
                links.insert(key.clone(), Slot::Ref(Reference::from_marker(marker)?));
            }
        }
        Ok(Self {
            core: EntityCore::new(referencer)
                .with_field(Self::LINKS, Slot::Map(links))
                .with_derived(Self::PRIMARY, Self::LINKS),
            id,
        })
    }
}

/// One decoding session: store, shared handle and decoder kept alive together.
pub struct Session {
    pub store: Rc<InMemoryReferencer>,
    pub shared: SharedReferencer,
    pub decoder: Decoder,
}

impl Session {
    pub fn new() -> Self {
        let (store, shared) = store();
        let decoder = decoder(&shared);
        Self {
            store,
            shared,
            decoder,
        }
    }

    pub fn decode(&self, response: Value) -> Vec<EntityRef> {
        self.decoder.decode_response(&response).unwrap()
    }
}
