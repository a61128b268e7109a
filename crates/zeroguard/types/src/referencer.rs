//! The session-scoped identifier to entity store.

use crate::entity::EntityRef;
use crate::error::ReferencerError;
use crate::reference::RefId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Shared handle to a referencer. Entities hold it weakly.
pub type SharedReferencer = Rc<dyn Referencer>;

/// Store of objects that were transmitted once and are pointed at by id.
///
/// Identifiers are unique for the lifetime of the store: inserting a present
/// identifier fails and leaves the store unchanged. Deleting and inserting
/// again is the only way to replace an entry.
pub trait Referencer {
    /// Look up an entity. A miss is `NotFound`.
    fn get(&self, id: RefId) -> Result<EntityRef, ReferencerError>;

    /// Insert an entity under a fresh identifier.
    fn set(&self, id: RefId, entity: EntityRef) -> Result<(), ReferencerError>;

    /// Remove and return an entity.
    fn delete(&self, id: RefId) -> Result<EntityRef, ReferencerError>;

    /// Presence check. Not counted as a lookup.
    fn contains(&self, id: RefId) -> bool;

    /// Identifiers in insertion order.
    fn ids(&self) -> Vec<RefId>;

    /// `(id, entity)` pairs in insertion order.
    fn items(&self) -> Vec<(RefId, EntityRef)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration for [`InMemoryReferencer`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferencerConfig {
    /// Attached to every log event the store emits.
    #[serde(default)]
    pub label: Option<String>,
}

/// Operation counters of an [`InMemoryReferencer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencerStats {
    /// Calls to `get`, hits and misses alike.
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub deletes: u64,
}

/// Insertion-ordered in-memory referencer.
#[derive(Default)]
pub struct InMemoryReferencer {
    entries: RefCell<IndexMap<RefId, EntityRef>>,
    stats: Cell<ReferencerStats>,
    config: ReferencerConfig,
}

impl InMemoryReferencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReferencerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Build a store already wrapped in the shared handle entities expect.
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    pub fn config(&self) -> &ReferencerConfig {
        &self.config
    }

    pub fn stats(&self) -> ReferencerStats {
        self.stats.get()
    }

    fn label(&self) -> &str {
        self.config.label.as_deref().unwrap_or("")
    }

    fn bump(&self, update: impl FnOnce(&mut ReferencerStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl Referencer for InMemoryReferencer {
    fn get(&self, id: RefId) -> Result<EntityRef, ReferencerError> {
        let found = self.entries.borrow().get(&id).cloned();
        match found {
            Some(entity) => {
                self.bump(|s| {
                    s.lookups += 1;
                    s.hits += 1;
                });
                debug!(label = self.label(), ref_id = id.0, "Found referenced object");
                Ok(entity)
            }
            None => {
                self.bump(|s| {
                    s.lookups += 1;
                    s.misses += 1;
                });
                debug!(label = self.label(), ref_id = id.0, "Referenced object not found");
                Err(ReferencerError::NotFound(id))
            }
        }
    }

    fn set(&self, id: RefId, entity: EntityRef) -> Result<(), ReferencerError> {
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&id) {
            return Err(ReferencerError::AlreadyExists(id));
        }
        let type_tag = entity.type_tag();
        entries.insert(id, entity);
        drop(entries);
        self.bump(|s| s.inserts += 1);
        debug!(label = self.label(), ref_id = id.0, type_tag, "Stored referenced object");
        Ok(())
    }

    fn delete(&self, id: RefId) -> Result<EntityRef, ReferencerError> {
        let removed = self.entries.borrow_mut().shift_remove(&id);
        let entity = removed.ok_or(ReferencerError::NotFound(id))?;
        self.bump(|s| s.deletes += 1);
        debug!(label = self.label(), ref_id = id.0, "Deleted referenced object");
        Ok(entity)
    }

    fn contains(&self, id: RefId) -> bool {
        self.entries.borrow().contains_key(&id)
    }

    fn ids(&self) -> Vec<RefId> {
        self.entries.borrow().keys().copied().collect()
    }

    fn items(&self) -> Vec<(RefId, EntityRef)> {
        self.entries
            .borrow()
            .iter()
            .map(|(id, entity)| (*id, EntityRef::clone(entity)))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl std::fmt::Debug for InMemoryReferencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReferencer")
            .field("ids", &self.ids())
            .field("stats", &self.stats.get())
            .field("config", &self.config)
            .finish()
    }
}
