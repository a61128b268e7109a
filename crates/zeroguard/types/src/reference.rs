//! References: placeholders for objects that are transmitted once and pointed
//! at everywhere else.

use crate::error::ReferenceError;
use crate::render::lpad;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key that marks a wire object as a reference rather than an inline object.
pub const REF_KEY: &str = "_ref";

/// Edge-local metadata carried next to a reference marker.
pub type EdgeFields = IndexMap<String, Value>;

/// Session-scoped object identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(pub u64);

impl RefId {
    /// Interpret a payload value as an identifier. Only non-negative
    /// integers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().map(Self)
    }

    /// Interpret a reference-table key (`"12"`) as an identifier.
    pub fn from_key(key: &str) -> Option<Self> {
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        key.parse().ok().map(Self)
    }
}

impl From<u64> for RefId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable placeholder for an object stored in the referencer.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    target_id: RefId,
    edge_fields: EdgeFields,
}

impl Reference {
    /// Build a reference. Edge values must be JSON scalars, and no edge
    /// field may use the marker key.
    pub fn new(target_id: RefId, edge_fields: EdgeFields) -> Result<Self, ReferenceError> {
        for (key, value) in &edge_fields {
            if key == REF_KEY {
                return Err(ReferenceError::InvalidEdgeFields(format!(
                    "edge field {:?} is reserved",
                    REF_KEY
                )));
            }
            if value.is_array() || value.is_object() {
                return Err(ReferenceError::InvalidEdgeFields(format!(
                    "edge field {:?} is not a scalar",
                    key
                )));
            }
        }
        Ok(Self {
            target_id,
            edge_fields,
        })
    }

    /// A reference without edge metadata.
    pub fn to(target_id: RefId) -> Self {
        Self {
            target_id,
            edge_fields: EdgeFields::new(),
        }
    }

    /// Build a reference out of untyped parts, as they appear in a payload.
    pub fn try_from_parts(target_id: &Value, edge_fields: &Value) -> Result<Self, ReferenceError> {
        let id = RefId::from_value(target_id)
            .ok_or_else(|| ReferenceError::InvalidIdentifier(target_id.to_string()))?;
        let fields = match edge_fields {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<EdgeFields>(),
            Value::Null => EdgeFields::new(),
            other => {
                return Err(ReferenceError::InvalidEdgeFields(format!(
                    "expected a mapping, got {}",
                    other
                )))
            }
        };
        Self::new(id, fields)
    }

    /// Whether a wire value is a reference marker (`{"_ref": ...}`).
    pub fn is_marker(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|obj| obj.contains_key(REF_KEY))
    }

    /// Parse a reference marker. Every key beside `_ref` is an edge field.
    pub fn from_marker(marker: &Map<String, Value>) -> Result<Self, ReferenceError> {
        let raw_id = marker
            .get(REF_KEY)
            .ok_or_else(|| ReferenceError::InvalidIdentifier("missing _ref".to_string()))?;
        let id = RefId::from_value(raw_id)
            .ok_or_else(|| ReferenceError::InvalidIdentifier(raw_id.to_string()))?;
        let fields = marker
            .iter()
            .filter(|(k, _)| k.as_str() != REF_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::new(id, fields)
    }

    /// Render back to wire shape.
    pub fn to_marker(&self) -> Value {
        let mut marker = Map::new();
        marker.insert(REF_KEY.to_string(), Value::from(self.target_id.0));
        for (k, v) in &self.edge_fields {
            marker.insert(k.clone(), v.clone());
        }
        Value::Object(marker)
    }

    pub fn target_id(&self) -> RefId {
        self.target_id
    }

    pub fn edge_fields(&self) -> &EdgeFields {
        &self.edge_fields
    }

    /// True only when the edge field is the boolean `true`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.edge_fields.get(name), Some(Value::Bool(true)))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.edge_fields.is_empty() {
            return write!(f, "Reference(ref_id={})", self.target_id);
        }
        let fields: Vec<String> = self
            .edge_fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(
            f,
            "Reference(\n  ref_id={}\n  fields=(\n{}\n  )\n)",
            self.target_id,
            lpad(&fields.join("\n"), 4)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marker(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn marker_with_edge_fields() {
        let r = Reference::from_marker(&marker(json!({"_ref": 1, "live": true}))).unwrap();
        assert_eq!(r.target_id(), RefId(1));
        assert!(r.flag("live"));
        assert!(!r.flag("oldest"));
        assert_eq!(r.edge_fields().len(), 1);
    }

    #[test]
    fn flag_requires_boolean_true() {
        let r = Reference::from_marker(&marker(json!({"_ref": 1, "live": "true"}))).unwrap();
        assert!(!r.flag("live"));
    }

    #[test]
    fn marker_rejects_bad_identifiers() {
        for bad in [json!({"_ref": -1}), json!({"_ref": "1"}), json!({"_ref": 1.5})] {
            let err = Reference::from_marker(&marker(bad)).unwrap_err();
            assert!(matches!(err, ReferenceError::InvalidIdentifier(_)));
        }
    }

    #[test]
    fn parts_reject_non_mapping_edge_fields() {
        let err = Reference::try_from_parts(&json!(3), &json!([1, 2])).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidEdgeFields(_)));
        let err = Reference::try_from_parts(&json!(null), &json!({})).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidIdentifier(_)));
        assert!(Reference::try_from_parts(&json!(3), &json!(null)).is_ok());
    }

    #[test]
    fn nested_edge_values_rejected() {
        let mut fields = EdgeFields::new();
        fields.insert("nested".into(), json!({"a": 1}));
        assert!(Reference::new(RefId(1), fields).is_err());
    }

    #[test]
    fn marker_key_is_not_an_edge_field() {
        let mut fields = EdgeFields::new();
        fields.insert(REF_KEY.into(), json!(5));
        let err = Reference::new(RefId(1), fields).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidEdgeFields(_)));

        let err = Reference::try_from_parts(&json!(1), &json!({"_ref": 5})).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidEdgeFields(_)));
    }

    #[test]
    fn marker_round_trip() {
        let wire = json!({"_ref": 4, "latest": true, "source": "dns"});
        let r = Reference::from_marker(&marker(wire.clone())).unwrap();
        assert_eq!(r.to_marker(), wire);
        assert!(Reference::is_marker(&wire));
        assert!(!Reference::is_marker(&json!({"type": "ipv4"})));
    }

    #[test]
    fn structural_equality() {
        let a = Reference::from_marker(&marker(json!({"_ref": 2, "live": true}))).unwrap();
        let b = Reference::from_marker(&marker(json!({"_ref": 2, "live": true}))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Reference::to(RefId(2)));
    }

    #[test]
    fn table_keys() {
        assert_eq!(RefId::from_key("12"), Some(RefId(12)));
        assert_eq!(RefId::from_key("-1"), None);
        assert_eq!(RefId::from_key("+1"), None);
        assert_eq!(RefId::from_key("x"), None);
        assert_eq!(RefId::from_key(""), None);
    }

    #[test]
    fn display() {
        assert_eq!(Reference::to(RefId(5)).to_string(), "Reference(ref_id=5)");
        let r = Reference::from_marker(&marker(json!({"_ref": 5, "live": true}))).unwrap();
        let text = r.to_string();
        assert!(text.contains("ref_id=5"));
        assert!(text.contains("    live=true"));
    }
}
