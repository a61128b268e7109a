//! The entity contract every domain type conforms to.

use crate::canonical::Canonicalizer;
use crate::error::{PayloadError, ResolveError};
use crate::reference::Reference;
use crate::referencer::SharedReferencer;
use crate::resolution::{EntityCore, Slot};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Shared handle to an entity. Entities live in the referencer arena and in
/// the resolved slots of other entities.
pub type EntityRef = Rc<dyn Entity>;

/// Upcast helpers so shared entities can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A domain object capable of lazy, memoized resolution of its own fields.
pub trait Entity: AsAny + fmt::Debug {
    /// Payload type tag (`"ipv4"`, `"netpref"`, ...).
    fn type_tag(&self) -> &'static str;

    /// Resolution-state table and referencer handle.
    fn core(&self) -> &EntityCore;

    /// Called exactly once per edge, the first time the edge's target is
    /// resolved while resolving one of this entity's fields. May claim this
    /// entity's derived attributes.
    fn reconcile(&self, edge: &Reference, target: &EntityRef) -> Result<(), ResolveError> {
        let _ = (edge, target);
        Ok(())
    }

    /// Fully resolved, round-trippable representation.
    fn to_canonical(&self, cx: &mut Canonicalizer) -> Result<Value, ResolveError>;

    /// Multi-line human-readable rendering. Never triggers resolution.
    fn render(&self) -> String;

    /// One-line identification used in logs and error messages.
    fn summary(&self) -> String;

    /// Value identifying the described object independently of the instance
    /// (an address, a prefix, a name). Two entities of one type with equal
    /// keys describe the same object.
    fn natural_key(&self) -> Option<String> {
        None
    }
}

/// Entities that can be built from a payload shard.
pub trait FromPayload: Entity + Sized {
    const TYPE: &'static str;

    fn from_payload(data: &Value, referencer: &SharedReferencer) -> Result<Self, PayloadError>;
}

impl dyn Entity {
    /// Resolve one lazy field, see [`EntityCore::resolve`].
    pub fn resolve(&self, field: &str) -> Result<Slot, ResolveError> {
        self.core().resolve(self, field)
    }

    /// Resolve every lazy field.
    pub fn resolve_all(&self) -> Result<(), ResolveError> {
        self.core().resolve_all(self)
    }

    pub fn canonical_form(&self) -> Result<Value, ResolveError> {
        Canonicalizer::new().entity(self)
    }

    pub fn is<T: Entity>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Display for dyn Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Downcast a shared entity to its concrete type.
pub fn downcast<T: Entity>(entity: &EntityRef) -> Option<Rc<T>> {
    let any: Rc<dyn Any> = Rc::clone(entity).into_any_rc();
    any.downcast::<T>().ok()
}

/// Identity comparison: both handles point at the same entity instance.
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Whether two handles describe the same object: either the same instance,
/// or entities of one type with equal natural keys.
pub fn equivalent_entity(a: &EntityRef, b: &EntityRef) -> bool {
    if same_entity(a, b) {
        return true;
    }
    if a.type_tag() != b.type_tag() {
        return false;
    }
    match (a.natural_key(), b.natural_key()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Build a payload entity and share it.
pub fn construct<T: FromPayload>(
    data: &Value,
    referencer: &SharedReferencer,
) -> Result<EntityRef, PayloadError> {
    Ok(Rc::new(T::from_payload(data, referencer)?))
}
