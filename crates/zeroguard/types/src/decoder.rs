//! Response document decoding.
//!
//! A response is `{"data": <object | array>, "references": {"<id>": <object>}}`.
//! Objects in the reference table are transmitted once per session and
//! pointed at from everywhere else by `{"_ref": <id>}` markers.

use crate::entity::EntityRef;
use crate::error::{DecodeError, PayloadError, ReferencerError};
use crate::reference::{RefId, Reference};
use crate::referencer::SharedReferencer;
use crate::registry::TypeRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Configuration for [`Decoder`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Resolve every lazy field of each top-level entity right after
    /// decoding, surfacing dangling references immediately.
    #[serde(default)]
    pub eager: bool,
    /// Attached to every log event the decoder emits.
    #[serde(default)]
    pub label: Option<String>,
}

/// Decodes response documents into entities backed by one referencer.
pub struct Decoder {
    registry: TypeRegistry,
    referencer: SharedReferencer,
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(referencer: SharedReferencer) -> Self {
        Self::with_config(referencer, DecoderConfig::default())
    }

    pub fn with_config(referencer: SharedReferencer, config: DecoderConfig) -> Self {
        Self {
            registry: TypeRegistry::new(),
            referencer,
            config,
        }
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn referencer(&self) -> &SharedReferencer {
        &self.referencer
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn label(&self) -> &str {
        self.config.label.as_deref().unwrap_or("")
    }

    /// Decode a whole response: load its reference table, then decode every
    /// top-level data object.
    pub fn decode_response(&self, response: &Value) -> Result<Vec<EntityRef>, DecodeError> {
        let document = response
            .as_object()
            .ok_or_else(|| DecodeError::MalformedResponse("response is not an object".into()))?;

        match document.get("references") {
            None | Some(Value::Null) => {}
            Some(Value::Object(table)) => self.load_references(table)?,
            Some(other) => {
                return Err(DecodeError::MalformedResponse(format!(
                    "references must be a mapping, got {}",
                    other
                )))
            }
        }

        let entities = match document.get("data") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.decode_object(item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(item @ Value::Object(_)) => vec![self.decode_object(item)?],
            Some(other) => {
                return Err(DecodeError::MalformedResponse(format!(
                    "data must be an object or a list, got {}",
                    other
                )))
            }
        };

        if self.config.eager {
            for entity in &entities {
                entity.resolve_all()?;
            }
        }

        debug!(
            label = self.label(),
            entities = entities.len(),
            stored = self.referencer.len(),
            "Decoded response"
        );
        Ok(entities)
    }

    /// Insert every reference-table entry not already known to the
    /// referencer. Known identifiers keep the object stored first.
    pub fn load_references(&self, table: &Map<String, Value>) -> Result<(), DecodeError> {
        for (key, data) in table {
            let id = RefId::from_key(key)
                .ok_or_else(|| ReferencerError::InvalidIdentifierType(key.clone()))?;
            if self.referencer.contains(id) {
                debug!(label = self.label(), ref_id = id.0, "Reusing shared object");
                continue;
            }
            let entity = self.registry.decode(data, &self.referencer)?;
            self.referencer.set(id, entity)?;
        }
        Ok(())
    }

    /// Decode one object. A reference marker yields the stored entity.
    pub fn decode_object(&self, data: &Value) -> Result<EntityRef, DecodeError> {
        match data {
            Value::Object(marker) if Reference::is_marker(data) => {
                let reference = Reference::from_marker(marker).map_err(PayloadError::from)?;
                Ok(self.referencer.get(reference.target_id())?)
            }
            _ => Ok(self.registry.decode(data, &self.referencer)?),
        }
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("registry", &self.registry)
            .field("stored", &self.referencer.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referencer::InMemoryReferencer;
    use serde_json::json;

    fn decoder() -> Decoder {
        Decoder::new(InMemoryReferencer::shared())
    }

    #[test]
    fn rejects_non_integer_table_keys() {
        let err = decoder()
            .decode_response(&json!({"data": [], "references": {"x1": {"type": "netpref", "prefix": "10.0.0.0/8"}}}))
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Referencer(ReferencerError::InvalidIdentifierType(key)) if key == "x1"
        ));
    }

    #[test]
    fn malformed_envelopes() {
        let d = decoder();
        assert!(matches!(
            d.decode_response(&json!([1])).unwrap_err(),
            DecodeError::MalformedResponse(_)
        ));
        assert!(matches!(
            d.decode_response(&json!({"data": 3})).unwrap_err(),
            DecodeError::MalformedResponse(_)
        ));
        assert!(matches!(
            d.decode_response(&json!({"references": []})).unwrap_err(),
            DecodeError::MalformedResponse(_)
        ));
    }

    #[test]
    fn single_object_and_empty_data() {
        let d = decoder();
        let out = d
            .decode_response(&json!({"data": {"type": "netpref", "prefix": "10.0.0.0/8"}}))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(d.decode_response(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn top_level_marker_returns_stored_entity() {
        let d = decoder();
        let out = d
            .decode_response(&json!({
                "data": [{"_ref": 2}],
                "references": {"2": {"type": "netpref", "prefix": "10.0.0.0/8"}}
            }))
            .unwrap();
        assert_eq!(out[0].type_tag(), "netpref");
        let err = d.decode_object(&json!({"_ref": 3})).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Referencer(ReferencerError::NotFound(RefId(3)))
        ));
    }

    #[test]
    fn config_defaults() {
        let config: DecoderConfig = serde_json::from_value(json!({"eager": true})).unwrap();
        assert!(config.eager);
        assert!(config.label.is_none());
        assert!(!DecoderConfig::default().eager);
    }
}
