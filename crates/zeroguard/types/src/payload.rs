//! Helpers for reading entity payload shards.

use crate::entity::{construct, FromPayload};
use crate::error::PayloadError;
use crate::reference::Reference;
use crate::referencer::SharedReferencer;
use crate::resolution::Slot;
use serde_json::{Map, Value};

/// Key holding the type tag of an inline object.
pub const TYPE_KEY: &str = "type";

/// Read the type tag of an inline object.
pub fn type_tag(data: &Value) -> Option<&str> {
    data.get(TYPE_KEY).and_then(Value::as_str)
}

/// Field access over one payload object, reporting errors against its type.
pub struct PayloadReader<'a> {
    type_tag: &'static str,
    object: &'a Map<String, Value>,
    referencer: &'a SharedReferencer,
}

impl<'a> PayloadReader<'a> {
    /// Check that `data` is an object tagged `type_tag`.
    pub fn open(
        type_tag: &'static str,
        data: &'a Value,
        referencer: &'a SharedReferencer,
    ) -> Result<Self, PayloadError> {
        let object = data
            .as_object()
            .ok_or_else(|| PayloadError::malformed(type_tag, "payload is not an object"))?;
        match object.get(TYPE_KEY) {
            Some(Value::String(tag)) if tag == type_tag => {}
            Some(Value::String(tag)) => {
                return Err(PayloadError::TypeMismatch {
                    expected: type_tag,
                    actual: tag.clone(),
                })
            }
            Some(other) => {
                return Err(PayloadError::TypeMismatch {
                    expected: type_tag,
                    actual: other.to_string(),
                })
            }
            None => return Err(PayloadError::malformed(type_tag, "missing type tag")),
        }
        Ok(Self {
            type_tag,
            object,
            referencer,
        })
    }

    /// A field that must be present and not null.
    pub fn required(&self, field: &str) -> Result<&'a Value, PayloadError> {
        self.optional(field).ok_or_else(|| {
            PayloadError::malformed(self.type_tag, format!("missing required field {}", field))
        })
    }

    /// A field that may be absent. Null counts as absent.
    pub fn optional(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    pub fn required_str(&self, field: &str) -> Result<&'a str, PayloadError> {
        self.required(field)?.as_str().ok_or_else(|| {
            PayloadError::malformed(self.type_tag, format!("field {} is not a string", field))
        })
    }

    /// A field holding one inline `T` or a reference marker.
    pub fn slot<T: FromPayload>(&self, field: &str) -> Result<Slot, PayloadError> {
        let value = self.required(field)?;
        self.parse_slot::<T>(field, value)
    }

    /// A field holding a list of inline `T`s and reference markers, mixed
    /// freely. Absent means empty.
    pub fn slot_list<T: FromPayload>(&self, field: &str) -> Result<Slot, PayloadError> {
        let Some(value) = self.optional(field) else {
            return Ok(Slot::empty_list());
        };
        let items = value.as_array().ok_or_else(|| {
            PayloadError::malformed(self.type_tag, format!("field {} is not a list", field))
        })?;
        items
            .iter()
            .map(|item| self.parse_slot::<T>(field, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Slot::List)
    }

    /// An optional inline `T`, used for explicitly transmitted derived values.
    pub fn optional_entity<T: FromPayload>(
        &self,
        field: &str,
    ) -> Result<Option<Slot>, PayloadError> {
        self.optional(field)
            .map(|value| self.parse_slot::<T>(field, value))
            .transpose()
    }

    fn parse_slot<T: FromPayload>(&self, field: &str, value: &Value) -> Result<Slot, PayloadError> {
        match value {
            Value::Object(marker) if Reference::is_marker(value) => {
                Ok(Slot::Ref(Reference::from_marker(marker)?))
            }
            Value::Object(_) => Ok(Slot::Entity(construct::<T>(value, self.referencer)?)),
            other => Err(PayloadError::malformed(
                self.type_tag,
                format!("field {} holds {}, expected an object or reference", field, other),
            )),
        }
    }
}
