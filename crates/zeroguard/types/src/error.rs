use crate::reference::RefId;
use zeroguard_validators::ValidationError;

/// Errors from constructing a [`Reference`](crate::Reference).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference identifier is not a non-negative integer: {0}")]
    InvalidIdentifier(String),
    #[error("invalid reference edge fields: {0}")]
    InvalidEdgeFields(String),
}

/// Errors from referencer store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferencerError {
    #[error("referenced object not found: {0}")]
    NotFound(RefId),
    #[error("referenced object with such ID already exists: {0}")]
    AlreadyExists(RefId),
    #[error("reference ID is not an integer: {0}")]
    InvalidIdentifierType(String),
}

/// Errors from building an entity out of a payload shard.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed {type_tag} payload: {reason}")]
    MalformedPayload {
        type_tag: &'static str,
        reason: String,
    },
    #[error("type tag mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },
    #[error("unknown type tag: {0}")]
    UnknownType(String),
    #[error("invalid {field} in {type_tag} payload: {source}")]
    InvalidField {
        type_tag: &'static str,
        field: String,
        source: ValidationError,
    },
    #[error("bad reference marker: {0}")]
    Reference(#[from] ReferenceError),
}

impl PayloadError {
    pub(crate) fn malformed(type_tag: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            type_tag,
            reason: reason.into(),
        }
    }
}

/// Errors from lazy attribute resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to dereference {field} -> object {target_id}: {source}")]
    DereferenceFailed {
        field: String,
        target_id: RefId,
        source: ReferencerError,
    },
    #[error("multiple objects claim {attribute}: accepted {accepted}, rejected {rejected}")]
    ConflictingClaim {
        attribute: String,
        accepted: String,
        rejected: String,
    },
    #[error("{attribute} of {type_tag} is unclaimed after resolving {master} and has no default")]
    UnresolvableDerivedAttribute {
        type_tag: &'static str,
        attribute: String,
        master: String,
    },
    #[error("{type_tag} has no resolvable field {field}")]
    UnknownField {
        type_tag: &'static str,
        field: String,
    },
    #[error("field {field} holds {actual}, expected {expected}")]
    UnexpectedTargetType {
        field: String,
        expected: &'static str,
        actual: String,
    },
    #[error("referencer dropped before {field} could be resolved")]
    ReferencerDropped { field: String },
    #[error("cycle through {type_tag} while rendering canonical form")]
    CyclicGraph { type_tag: &'static str },
}

/// Errors from decoding a whole response document.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
    #[error("referencer error: {0}")]
    Referencer(#[from] ReferencerError),
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dereference_failed_display_names_target() {
        let e = ResolveError::DereferenceFailed {
            field: "closest_prefix".into(),
            target_id: RefId(7),
            source: ReferencerError::NotFound(RefId(7)),
        };
        let msg = e.to_string();
        assert!(msg.contains("closest_prefix"));
        assert!(msg.contains("not found: 7"));
    }

    #[test]
    fn dereference_failed_has_source() {
        use std::error::Error;
        let e = ResolveError::DereferenceFailed {
            field: "prefixes".into(),
            target_id: RefId(1),
            source: ReferencerError::NotFound(RefId(1)),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn payload_error_from_reference() {
        let re = ReferenceError::InvalidIdentifier("\"x\"".into());
        let pe: PayloadError = re.into();
        assert!(matches!(pe, PayloadError::Reference(_)));
    }

    #[test]
    fn decode_error_from_resolve() {
        let re = ResolveError::CyclicGraph { type_tag: "ipv4" };
        let de: DecodeError = re.into();
        assert!(matches!(de, DecodeError::Resolve(_)));
    }
}
