//! Type tag to entity constructor dispatch.

use crate::entities::{Ipv4Address, Ipv6Address, NetworkPrefix, Subdomain};
use crate::entity::{construct, EntityRef, FromPayload};
use crate::error::PayloadError;
use crate::payload::type_tag;
use crate::referencer::SharedReferencer;
use serde_json::Value;
use std::collections::HashMap;

/// Builds a shared entity from a payload shard.
pub type EntityConstructor = fn(&Value, &SharedReferencer) -> Result<EntityRef, PayloadError>;

/// Maps payload type tags to constructors. New entity types plug in here
/// without changes to the resolution engine.
#[derive(Clone)]
pub struct TypeRegistry {
    constructors: HashMap<String, EntityConstructor>,
}

impl TypeRegistry {
    /// Registry with every built-in entity type.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<NetworkPrefix>();
        registry.register::<Ipv4Address>();
        registry.register::<Ipv6Address>();
        registry.register::<Subdomain>();
        registry
    }

    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register<T: FromPayload>(&mut self) {
        self.register_constructor(T::TYPE, construct::<T>);
    }

    /// Register a constructor under `tag`, replacing any previous one.
    pub fn register_constructor(&mut self, tag: &str, constructor: EntityConstructor) {
        self.constructors.insert(tag.to_string(), constructor);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Build an entity, dispatching on the payload's `type` tag.
    pub fn decode(
        &self,
        data: &Value,
        referencer: &SharedReferencer,
    ) -> Result<EntityRef, PayloadError> {
        let tag = type_tag(data).ok_or_else(|| PayloadError::UnknownType(data.to_string()))?;
        let constructor = self
            .constructors
            .get(tag)
            .ok_or_else(|| PayloadError::UnknownType(tag.to_string()))?;
        constructor(data, referencer)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referencer::InMemoryReferencer;
    use serde_json::json;

    #[test]
    fn builtin_tags() {
        assert_eq!(
            TypeRegistry::new().tags(),
            vec!["ipv4", "ipv6", "netpref", "subdomain"]
        );
        assert!(TypeRegistry::empty().tags().is_empty());
    }

    #[test]
    fn dispatches_on_tag() {
        let r: SharedReferencer = InMemoryReferencer::shared();
        let registry = TypeRegistry::new();
        let entity = registry
            .decode(&json!({"type": "netpref", "prefix": "10.0.0.0/8"}), &r)
            .unwrap();
        assert!(entity.is::<NetworkPrefix>());
    }

    #[test]
    fn unknown_and_missing_tags() {
        let r: SharedReferencer = InMemoryReferencer::shared();
        let registry = TypeRegistry::new();
        let err = registry.decode(&json!({"type": "asn"}), &r).unwrap_err();
        assert!(matches!(err, PayloadError::UnknownType(tag) if tag == "asn"));
        let err = registry.decode(&json!({"prefix": "10.0.0.0/8"}), &r).unwrap_err();
        assert!(matches!(err, PayloadError::UnknownType(_)));
    }

    #[test]
    fn empty_registry_rejects_builtin_tags() {
        let r: SharedReferencer = InMemoryReferencer::shared();
        let mut registry = TypeRegistry::empty();
        assert!(registry
            .decode(&json!({"type": "netpref", "prefix": "10.0.0.0/8"}), &r)
            .is_err());
        registry.register::<NetworkPrefix>();
        assert!(registry.contains("netpref"));
    }
}
