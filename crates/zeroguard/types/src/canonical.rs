//! Canonical form: a fully resolved representation with every entity inlined.
//!
//! The canonical form of an entity, fed back through the entity's payload
//! constructor with an empty referencer, yields an equal canonical form.

use crate::entity::{Entity, EntityRef};
use crate::error::ResolveError;
use crate::resolution::Slot;
use serde_json::{Map, Value};

/// Walks an entity graph while tracking the current path, so a reference
/// cycle is reported instead of recursing forever.
#[derive(Debug, Default)]
pub struct Canonicalizer {
    path: Vec<*const ()>,
}

impl Canonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical form of one entity, resolving its fields on the way.
    pub fn entity(&mut self, entity: &dyn Entity) -> Result<Value, ResolveError> {
        let addr = entity as *const dyn Entity as *const ();
        if self.path.contains(&addr) {
            return Err(ResolveError::CyclicGraph {
                type_tag: entity.type_tag(),
            });
        }
        self.path.push(addr);
        let result = entity.to_canonical(self);
        self.path.pop();
        result
    }

    /// Canonical form of a resolved slot. A reference left in the slot is
    /// rendered back to its marker.
    pub fn slot(&mut self, slot: &Slot) -> Result<Value, ResolveError> {
        match slot {
            Slot::Value(value) => Ok(value.clone()),
            Slot::Ref(reference) => Ok(reference.to_marker()),
            Slot::Entity(entity) => self.entity(entity.as_ref()),
            Slot::List(items) => items
                .iter()
                .map(|item| self.slot(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Slot::Map(entries) => {
                let mut map = Map::new();
                for (key, item) in entries {
                    map.insert(key.clone(), self.slot(item)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Canonical form of an optional entity; `None` renders as null.
    pub fn optional(&mut self, entity: Option<&EntityRef>) -> Result<Value, ResolveError> {
        match entity {
            Some(entity) => self.entity(entity.as_ref()),
            None => Ok(Value::Null),
        }
    }
}
