//! Lazy resolution core shared by every entity.
//!
//! An [`EntityCore`] owns two tables:
//!
//! - **fields**: lazy fields keyed by name. Each holds a raw [`Slot`] (which
//!   may contain [`Reference`]s, possibly nested in lists or maps) and a
//!   [`FieldState`]. Resolving a field dereferences every pending reference
//!   through the referencer, runs the owner's `reconcile` callback once per
//!   edge and memoizes the result.
//! - **derived**: attributes without a source value of their own. They are
//!   claimed by `reconcile` while their master field resolves, and fall back
//!   to a caller-supplied default once the master is fully resolved.
//!
//! No `RefCell` borrow is held across a call into the referencer or into
//! another entity, so resolution may recurse freely.

use crate::entity::{downcast, equivalent_entity, Entity, EntityRef, FromPayload};
use crate::error::ResolveError;
use crate::reference::Reference;
use crate::referencer::{Referencer, SharedReferencer};
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Raw or resolved content of a lazy field.
#[derive(Clone)]
pub enum Slot {
    /// A plain value that never needs resolution.
    Value(Value),
    /// A pending edge to an object in the referencer.
    Ref(Reference),
    /// A materialized entity (inline in the payload or already dereferenced).
    Entity(EntityRef),
    List(Vec<Slot>),
    Map(IndexMap<String, Slot>),
}

impl Slot {
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// Whether any reference is still pending anywhere inside this slot.
    pub fn is_pending(&self) -> bool {
        match self {
            Self::Ref(_) => true,
            Self::List(items) => items.iter().any(Slot::is_pending),
            Self::Map(entries) => entries.values().any(Slot::is_pending),
            Self::Value(_) | Self::Entity(_) => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Value(v) => format!("value {}", v),
            Self::Ref(r) => format!("pending reference to {}", r.target_id()),
            Self::Entity(e) => e.type_tag().to_string(),
            Self::List(_) => "list".to_string(),
            Self::Map(_) => "map".to_string(),
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Ref(r) => f.debug_tuple("Ref").field(r).finish(),
            // Entities may point back at each other; print only the identity.
            Self::Entity(e) => write!(f, "Entity({})", e.summary()),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Map(entries) => f.debug_map().entries(entries).finish(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldState {
    Unresolved,
    Resolved,
}

/// State of a derived attribute. `Resolved(None)` is a legitimate value
/// ("nothing claims this role"), distinct from `Unresolved`.
#[derive(Clone)]
pub enum Derived {
    Unresolved,
    Resolved(Option<EntityRef>),
}

impl Derived {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Debug for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "Unresolved"),
            Self::Resolved(None) => write!(f, "Resolved(None)"),
            Self::Resolved(Some(e)) => write!(f, "Resolved({})", e.summary()),
        }
    }
}

/// What a derived attribute becomes when its master resolved and nothing
/// claimed it.
#[derive(Clone)]
pub enum DerivedDefault {
    /// Resolve to "no claimant".
    NoClaimant,
    /// Resolve to the given entity.
    Entity(EntityRef),
    /// No default permitted: fail with `UnresolvableDerivedAttribute`.
    Required,
}

#[derive(Debug)]
struct FieldEntry {
    slot: Slot,
    state: FieldState,
}

#[derive(Debug)]
struct DerivedEntry {
    master: &'static str,
    state: Derived,
}

/// Resolution interrupted partway: the slot as far as it got, and why.
struct Interrupted {
    slot: Slot,
    error: ResolveError,
}

/// Per-entity resolution-state table plus the handle to the referencer.
pub struct EntityCore {
    referencer: Weak<dyn Referencer>,
    fields: RefCell<IndexMap<&'static str, FieldEntry>>,
    derived: RefCell<IndexMap<&'static str, DerivedEntry>>,
}

impl EntityCore {
    pub fn new(referencer: &SharedReferencer) -> Self {
        Self {
            referencer: Rc::downgrade(referencer),
            fields: RefCell::new(IndexMap::new()),
            derived: RefCell::new(IndexMap::new()),
        }
    }

    /// Declare a lazy field. Slots holding no reference start resolved.
    pub fn with_field(self, name: &'static str, slot: Slot) -> Self {
        let state = if slot.is_pending() {
            FieldState::Unresolved
        } else {
            FieldState::Resolved
        };
        self.fields
            .borrow_mut()
            .insert(name, FieldEntry { slot, state });
        self
    }

    /// Declare a derived attribute populated while `master` resolves.
    pub fn with_derived(self, name: &'static str, master: &'static str) -> Self {
        self.derived.borrow_mut().insert(
            name,
            DerivedEntry {
                master,
                state: Derived::Unresolved,
            },
        );
        self
    }

    /// Declare a derived attribute whose value the payload already carries.
    pub fn with_derived_value(
        self,
        name: &'static str,
        master: &'static str,
        value: Option<EntityRef>,
    ) -> Self {
        let state = match value {
            Some(entity) => Derived::Resolved(Some(entity)),
            None => Derived::Unresolved,
        };
        self.derived
            .borrow_mut()
            .insert(name, DerivedEntry { master, state });
        self
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.borrow().keys().copied().collect()
    }

    pub fn field_state(&self, field: &str) -> Option<FieldState> {
        self.fields.borrow().get(field).map(|entry| entry.state)
    }

    /// The current content of a field, without resolving anything.
    pub fn peek(&self, field: &str) -> Option<Slot> {
        self.fields.borrow().get(field).map(|entry| entry.slot.clone())
    }

    /// The current state of a derived attribute, without resolving anything.
    pub fn peek_derived(&self, name: &str) -> Option<Derived> {
        self.derived.borrow().get(name).map(|entry| entry.state.clone())
    }

    /// Resolve a lazy field.
    ///
    /// A resolved field returns its memoized slot without touching the
    /// referencer. Otherwise every pending reference is dereferenced in
    /// stored order and `owner.reconcile` runs once per edge. On failure the
    /// field stays unresolved, but edges already consumed are written back so
    /// a later retry neither dereferences nor reconciles them again.
    pub fn resolve(&self, owner: &dyn Entity, field: &str) -> Result<Slot, ResolveError> {
        let (name, pending) = {
            let fields = self.fields.borrow();
            let (name, entry) = fields
                .get_key_value(field)
                .ok_or_else(|| ResolveError::UnknownField {
                    type_tag: owner.type_tag(),
                    field: field.to_string(),
                })?;
            if entry.state == FieldState::Resolved {
                return Ok(entry.slot.clone());
            }
            (*name, entry.slot.clone())
        };

        let outcome = self.resolve_slot(owner, name, pending);
        let (slot, result) = match outcome {
            Ok(slot) => (slot, Ok(())),
            Err(Interrupted { slot, error }) => (slot, Err(error)),
        };

        let mut fields = self.fields.borrow_mut();
        if let Some(entry) = fields.get_mut(name) {
            entry.slot = slot.clone();
            if result.is_ok() {
                entry.state = FieldState::Resolved;
            }
        }
        drop(fields);

        match result {
            Ok(()) => {
                debug!(type_tag = owner.type_tag(), field = name, "Field resolved");
                Ok(slot)
            }
            Err(error) => {
                debug!(
                    type_tag = owner.type_tag(),
                    field = name,
                    error = %error,
                    "Field resolution failed"
                );
                Err(error)
            }
        }
    }

    /// Resolve every lazy field, stopping at the first failure.
    pub fn resolve_all(&self, owner: &dyn Entity) -> Result<(), ResolveError> {
        for field in self.field_names() {
            self.resolve(owner, field)?;
        }
        Ok(())
    }

    fn resolve_slot(
        &self,
        owner: &dyn Entity,
        field: &'static str,
        slot: Slot,
    ) -> Result<Slot, Interrupted> {
        match slot {
            Slot::Ref(reference) => match self.dereference(owner, field, &reference) {
                Ok(entity) => Ok(Slot::Entity(entity)),
                Err(error) => Err(Interrupted {
                    slot: Slot::Ref(reference),
                    error,
                }),
            },
            Slot::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                let mut rest = items.into_iter();
                while let Some(item) = rest.next() {
                    match self.resolve_slot(owner, field, item) {
                        Ok(slot) => resolved.push(slot),
                        Err(Interrupted { slot, error }) => {
                            resolved.push(slot);
                            resolved.extend(rest);
                            return Err(Interrupted {
                                slot: Slot::List(resolved),
                                error,
                            });
                        }
                    }
                }
                Ok(Slot::List(resolved))
            }
            Slot::Map(entries) => {
                let mut resolved = IndexMap::with_capacity(entries.len());
                let mut rest = entries.into_iter();
                while let Some((key, item)) = rest.next() {
                    match self.resolve_slot(owner, field, item) {
                        Ok(slot) => {
                            resolved.insert(key, slot);
                        }
                        Err(Interrupted { slot, error }) => {
                            resolved.insert(key, slot);
                            resolved.extend(rest);
                            return Err(Interrupted {
                                slot: Slot::Map(resolved),
                                error,
                            });
                        }
                    }
                }
                Ok(Slot::Map(resolved))
            }
            done => Ok(done),
        }
    }

    fn dereference(
        &self,
        owner: &dyn Entity,
        field: &'static str,
        reference: &Reference,
    ) -> Result<EntityRef, ResolveError> {
        let referencer = self
            .referencer
            .upgrade()
            .ok_or_else(|| ResolveError::ReferencerDropped {
                field: field.to_string(),
            })?;
        let target = referencer
            .get(reference.target_id())
            .map_err(|source| ResolveError::DereferenceFailed {
                field: field.to_string(),
                target_id: reference.target_id(),
                source,
            })?;
        owner.reconcile(reference, &target)?;
        debug!(
            type_tag = owner.type_tag(),
            field,
            ref_id = reference.target_id().0,
            target = %target.summary(),
            "Dereferenced object reference"
        );
        Ok(target)
    }

    /// Claim a derived attribute for `target`. Called from `reconcile`.
    ///
    /// Claiming with the entity that already holds the attribute, or with
    /// one describing the same object (a payload preset of the referenced
    /// address), is a no-op and keeps the held value. Any other claim on a
    /// resolved attribute is a `ConflictingClaim`.
    pub fn claim(
        &self,
        owner: &dyn Entity,
        name: &str,
        target: &EntityRef,
    ) -> Result<(), ResolveError> {
        let existing = {
            let mut derived = self.derived.borrow_mut();
            let entry = derived
                .get_mut(name)
                .ok_or_else(|| ResolveError::UnknownField {
                    type_tag: owner.type_tag(),
                    field: name.to_string(),
                })?;
            let current = match &entry.state {
                Derived::Unresolved => None,
                Derived::Resolved(Some(current)) if equivalent_entity(current, target) => {
                    return Ok(())
                }
                Derived::Resolved(current) => Some(current.clone()),
            };
            if current.is_none() {
                entry.state = Derived::Resolved(Some(Rc::clone(target)));
            }
            current
        };

        match existing {
            None => {
                debug!(
                    type_tag = owner.type_tag(),
                    attribute = name,
                    claimant = %target.summary(),
                    "Derived attribute claimed"
                );
                Ok(())
            }
            Some(accepted) => Err(ResolveError::ConflictingClaim {
                attribute: name.to_string(),
                accepted: accepted
                    .map(|e| e.summary())
                    .unwrap_or_else(|| "none".to_string()),
                rejected: target.summary(),
            }),
        }
    }

    /// Read a derived attribute, resolving its master first if needed.
    pub fn resolve_derived(
        &self,
        owner: &dyn Entity,
        name: &str,
        default: DerivedDefault,
    ) -> Result<Option<EntityRef>, ResolveError> {
        let (name, master) = {
            let derived = self.derived.borrow();
            let (key, entry) =
                derived
                    .get_key_value(name)
                    .ok_or_else(|| ResolveError::UnknownField {
                        type_tag: owner.type_tag(),
                        field: name.to_string(),
                    })?;
            if let Derived::Resolved(value) = &entry.state {
                return Ok(value.clone());
            }
            (*key, entry.master)
        };

        self.resolve(owner, master)?;

        let mut derived = self.derived.borrow_mut();
        let Some(entry) = derived.get_mut(name) else {
            return Err(ResolveError::UnknownField {
                type_tag: owner.type_tag(),
                field: name.to_string(),
            });
        };
        if let Derived::Resolved(value) = &entry.state {
            return Ok(value.clone());
        }
        let value = match default {
            DerivedDefault::NoClaimant => None,
            DerivedDefault::Entity(entity) => Some(entity),
            DerivedDefault::Required => {
                return Err(ResolveError::UnresolvableDerivedAttribute {
                    type_tag: owner.type_tag(),
                    attribute: name.to_string(),
                    master: master.to_string(),
                })
            }
        };
        entry.state = Derived::Resolved(value.clone());
        debug!(
            type_tag = owner.type_tag(),
            attribute = name,
            claimed = value.is_some(),
            "Derived attribute defaulted"
        );
        Ok(value)
    }
}

impl fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCore")
            .field("fields", &self.fields.borrow())
            .field("derived", &self.derived.borrow())
            .finish()
    }
}

// ── Typed slot access ───────────────────────────────────────────────

/// Interpret a resolved slot as a single entity of type `T`.
pub fn expect_entity<T: FromPayload>(field: &str, slot: Slot) -> Result<Rc<T>, ResolveError> {
    match slot {
        Slot::Entity(entity) => downcast::<T>(&entity).ok_or_else(|| {
            ResolveError::UnexpectedTargetType {
                field: field.to_string(),
                expected: T::TYPE,
                actual: entity.type_tag().to_string(),
            }
        }),
        other => Err(ResolveError::UnexpectedTargetType {
            field: field.to_string(),
            expected: T::TYPE,
            actual: other.describe(),
        }),
    }
}

/// Interpret a resolved slot as a list of entities of type `T`.
pub fn expect_entity_list<T: FromPayload>(
    field: &str,
    slot: Slot,
) -> Result<Vec<Rc<T>>, ResolveError> {
    match slot {
        Slot::List(items) => items
            .into_iter()
            .map(|item| expect_entity::<T>(field, item))
            .collect(),
        other => Err(ResolveError::UnexpectedTargetType {
            field: field.to_string(),
            expected: T::TYPE,
            actual: other.describe(),
        }),
    }
}

/// Interpret an optional derived entity as type `T`.
pub fn expect_derived<T: FromPayload>(
    name: &str,
    value: Option<EntityRef>,
) -> Result<Option<Rc<T>>, ResolveError> {
    value
        .map(|entity| {
            downcast::<T>(&entity).ok_or_else(|| ResolveError::UnexpectedTargetType {
                field: name.to_string(),
                expected: T::TYPE,
                actual: entity.type_tag().to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::RefId;
    use serde_json::json;

    #[test]
    fn pending_detection_is_recursive() {
        assert!(!Slot::Value(json!(1)).is_pending());
        assert!(!Slot::empty_list().is_pending());
        let nested = Slot::Map(IndexMap::from([(
            "a".to_string(),
            Slot::List(vec![Slot::Value(json!("x")), Slot::Ref(Reference::to(RefId(1)))]),
        )]));
        assert!(nested.is_pending());
    }

    #[test]
    fn derived_debug_is_three_way() {
        assert_eq!(format!("{:?}", Derived::Unresolved), "Unresolved");
        assert_eq!(format!("{:?}", Derived::Resolved(None)), "Resolved(None)");
        assert!(!Derived::Unresolved.is_resolved());
        assert!(Derived::Resolved(None).is_resolved());
    }

    #[test]
    fn expect_entity_rejects_plain_values() {
        let err = expect_entity::<crate::entities::NetworkPrefix>("p", Slot::Value(json!(3)))
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnexpectedTargetType {
                field: "p".into(),
                expected: "netpref",
                actual: "value 3".into(),
            }
        );
    }
}
