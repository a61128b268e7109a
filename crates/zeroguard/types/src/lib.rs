#![deny(unsafe_code)]
//! # zeroguard-types
//!
//! Object-graph reconstruction for ZeroGuard API payloads.
//!
//! Payloads de-duplicate shared sub-objects: an object is transmitted once
//! under a small integer identifier and every other place that needs it
//! carries a reference marker instead, optionally with edge metadata:
//!
//! ```text
//! {"type": "ipv4", "address": "8.8.8.8", "closest_prefix": {"_ref": 1}}
//! {"type": "subdomain", "name": "dns.google", "ipv4": [{"_ref": 10, "live": true}]}
//! ```
//!
//! References are resolved lazily through a session-scoped [`Referencer`]
//! the first time a field is read, and memoized afterwards. Resolving a
//! master field may claim derived attributes of its owner (a subdomain's
//! `live_ipv4` is claimed by the edge flagged `live`), with at most one
//! claimant per attribute.
//!
//! ## Key Types
//!
//! - [`Reference`] - placeholder for an object stored in the referencer
//! - [`Referencer`] / [`InMemoryReferencer`] - the identifier to entity store
//! - [`Entity`] / [`EntityCore`] - lazy, memoized field resolution
//! - [`NetworkPrefix`], [`Ipv4Address`], [`Ipv6Address`], [`Subdomain`]
//! - [`TypeRegistry`] and [`Decoder`] - response documents to entities
//!
//! Entities and the store share state through `Rc`, so a session stays on
//! one thread.

pub mod canonical;
pub mod decoder;
pub mod entities;
pub mod entity;
pub mod error;
pub mod payload;
pub mod reference;
pub mod referencer;
pub mod registry;
pub mod render;
pub mod resolution;

pub use canonical::Canonicalizer;
pub use resolution::{Derived, DerivedDefault, EntityCore, FieldState, Slot};
pub use decoder::{Decoder, DecoderConfig};
pub use entities::{
    AddressRole, IpAddressEntity, IpFamily, Ipv4Address, Ipv6Address, NetworkPrefix,
    ReputationEntry, Subdomain,
};
pub use entity::{construct, downcast, equivalent_entity, same_entity, Entity, EntityRef, FromPayload};
pub use error::{DecodeError, PayloadError, ReferenceError, ReferencerError, ResolveError};
pub use reference::{EdgeFields, RefId, Reference};
pub use referencer::{
    InMemoryReferencer, Referencer, ReferencerConfig, ReferencerStats, SharedReferencer,
};
pub use registry::{EntityConstructor, TypeRegistry};
