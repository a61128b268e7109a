//! Property tests: store invariants and resolution order hold for arbitrary
//! operation sequences and payload shapes.

mod common;

use common::*;
use indexmap::IndexMap;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use zeroguard_types::{
    construct, downcast, EntityRef, Ipv4Address, NetworkPrefix, RefId, Referencer,
    ReferencerError, ResolveError, SharedReferencer, Subdomain, TypeRegistry,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum StoreOp {
    Set(u64),
    Delete(u64),
}

fn arb_store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (0u64..8).prop_map(StoreOp::Set),
        (0u64..8).prop_map(StoreOp::Delete),
    ]
}

fn construct_any(data: &Value, shared: &SharedReferencer) -> EntityRef {
    TypeRegistry::new().decode(data, shared).unwrap()
}

fn address(i: usize) -> String {
    format!("10.0.{}.1", i)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// The store behaves like an insertion-ordered map with insert-once keys.
    #[test]
    fn store_matches_insert_once_model(ops in prop::collection::vec(arb_store_op(), 1..60)) {
        let (store, shared) = store();
        let mut model: IndexMap<u64, String> = IndexMap::new();

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                StoreOp::Set(id) => {
                    let cidr = format!("10.{}.0.0/16", step % 256);
                    let entity = construct::<NetworkPrefix>(&prefix(&cidr), &shared).unwrap();
                    let result = store.set(RefId(id), entity);
                    if model.contains_key(&id) {
                        prop_assert_eq!(result, Err(ReferencerError::AlreadyExists(RefId(id))));
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(id, cidr);
                    }
                }
                StoreOp::Delete(id) => {
                    let result = store.delete(RefId(id));
                    match model.shift_remove(&id) {
                        Some(_) => prop_assert!(result.is_ok()),
                        None => prop_assert_eq!(
                            result.err(),
                            Some(ReferencerError::NotFound(RefId(id)))
                        ),
                    }
                }
            }
        }

        prop_assert_eq!(store.len(), model.len());
        let expected: Vec<RefId> = model.keys().map(|id| RefId(*id)).collect();
        prop_assert_eq!(store.ids(), expected);
        for (id, cidr) in &model {
            let entity = store.get(RefId(*id)).unwrap();
            let stored = downcast::<NetworkPrefix>(&entity).unwrap();
            prop_assert_eq!(&stored.prefix().to_string(), cidr);
        }
    }

    /// Construction and insertion order do not matter as long as every
    /// target is stored before the first read.
    #[test]
    fn insertion_order_is_irrelevant(order in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle()) {
        let (store, shared) = store();
        // ids 0..6 are addresses pointing at prefixes 6..12
        let payload = |i: usize| {
            if i < 6 {
                ipv4(&address(i), json!({"_ref": i + 6}))
            } else {
                prefix(&format!("10.0.{}.0/24", i - 6))
            }
        };
        let entities: Vec<_> = (0..12)
            .map(|i| construct_any(&payload(i), &shared))
            .collect();
        for i in order {
            store.set(RefId(i as u64), entities[i].clone()).unwrap();
        }
        for (i, entity) in entities.iter().enumerate().take(6) {
            let ip = downcast::<Ipv4Address>(entity).unwrap();
            prop_assert_eq!(
                ip.closest_prefix().unwrap().prefix().to_string(),
                format!("10.0.{}.0/24", i)
            );
        }
    }

    /// Claims are processed in stored order: the first flagged edge wins and
    /// a second one is rejected.
    #[test]
    fn first_live_edge_wins(flags in prop::collection::vec(any::<bool>(), 1..8)) {
        let session = Session::new();
        let mut references = Map::new();
        references.insert("1000".into(), prefix("10.0.0.0/16"));
        let mut edges = Vec::new();
        for (i, live) in flags.iter().enumerate() {
            references.insert(i.to_string(), ipv4(&address(i), json!({"_ref": 1000})));
            edges.push(json!({"_ref": i, "live": live}));
        }
        let out = session.decode(json!({
            "data": [subdomain("p.example.com", json!(edges))],
            "references": references
        }));
        let sub = downcast::<Subdomain>(&out[0]).unwrap();

        let flagged: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(i, _)| i)
            .collect();
        match flagged.as_slice() {
            [] => prop_assert!(sub.live_ipv4().unwrap().is_none()),
            [only] => prop_assert_eq!(
                sub.live_ipv4().unwrap().unwrap().address().to_string(),
                address(*only)
            ),
            [first, second, ..] => prop_assert_eq!(
                sub.live_ipv4().unwrap_err(),
                ResolveError::ConflictingClaim {
                    attribute: "live_ipv4".into(),
                    accepted: format!("IPv4Address({})", address(*first)),
                    rejected: format!("IPv4Address({})", address(*second)),
                }
            ),
        }
    }

    /// A resolved field is served from memory no matter how often it is read.
    #[test]
    fn reads_after_resolution_never_hit_the_store(reads in 1usize..20) {
        let (store, shared) = store();
        store
            .set(RefId(1), construct::<NetworkPrefix>(&prefix("10.0.0.0/8"), &shared).unwrap())
            .unwrap();
        let ip = construct::<Ipv4Address>(&ipv4("10.1.1.1", json!({"_ref": 1})), &shared).unwrap();
        let ip = downcast::<Ipv4Address>(&ip).unwrap();
        for _ in 0..reads {
            ip.closest_prefix().unwrap();
        }
        prop_assert_eq!(store.stats().lookups, 1);
    }
}
