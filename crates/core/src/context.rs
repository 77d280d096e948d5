//! Dispatch metadata and call context
//!
//! The dispatch payload arrives in an ambiguous shape (absent, raw bytes,
//! string-encoded JSON, or an already-structured value) and is resolved by
//! explicit type inspection into a validated [`CallContext`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Raw dispatch payload, resolved by explicit shape inspection.
#[derive(Debug, Clone)]
pub enum DispatchPayload {
    /// No metadata was attached to the dispatch.
    Empty,
    /// Text that may contain JSON.
    Raw(String),
    /// An already-structured JSON value.
    Structured(Value),
}

impl DispatchPayload {
    /// Build a payload from optional raw bytes, decoded as UTF-8 text.
    ///
    /// Invalid UTF-8 degrades to [`DispatchPayload::Empty`].
    pub fn from_bytes(bytes: Option<&[u8]>) -> Self {
        match bytes {
            None => DispatchPayload::Empty,
            Some(b) => match std::str::from_utf8(b) {
                Ok(text) => Self::from_text(Some(text)),
                Err(e) => {
                    tracing::warn!("dispatch metadata is not valid UTF-8: {e}");
                    DispatchPayload::Empty
                }
            },
        }
    }

    /// Build a payload from optional text. Blank text counts as absent.
    pub fn from_text(text: Option<&str>) -> Self {
        match text {
            None => DispatchPayload::Empty,
            Some(t) if t.trim().is_empty() => DispatchPayload::Empty,
            Some(t) => DispatchPayload::Raw(t.to_string()),
        }
    }
}

/// Metadata object carried on the dispatch wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefilled_greeting: Option<String>,
}

/// Validated per-call context. Required ids are non-empty.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub template_id: String,
    pub organization_id: String,
    pub patient_id: String,
    pub intake_id: Option<String>,
    pub phone_number: Option<String>,
    /// A greeting already composed (and possibly delivered) upstream.
    pub prefilled_greeting: Option<String>,
    /// The metadata value this context was built from.
    pub raw: Value,
}

impl CallContext {
    /// Validate a metadata object into a context.
    ///
    /// Only a missing identity field fails; every non-identity field falls
    /// back to its default.
    pub fn from_metadata(meta: CallMetadata, raw: Value) -> Result<Self, ValidationError> {
        let template_id = require(meta.template_id, "template_id")?;
        let organization_id = require(meta.organization_id, "organization_id")?;
        let patient_id = require(meta.patient_id, "patient_id")?;

        Ok(Self {
            template_id,
            organization_id,
            patient_id,
            intake_id: non_empty(meta.intake_id),
            phone_number: non_empty(meta.phone_number),
            prefilled_greeting: non_empty(meta.prefilled_greeting),
            raw,
        })
    }
}

fn require(field: Option<String>, name: &'static str) -> Result<String, ValidationError> {
    match field {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingIdentity(name)),
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(template: Option<&str>, org: Option<&str>, patient: Option<&str>) -> CallMetadata {
        CallMetadata {
            template_id: template.map(String::from),
            organization_id: org.map(String::from),
            patient_id: patient.map(String::from),
            ..CallMetadata::default()
        }
    }

    #[test]
    fn test_context_requires_identity_fields() {
        let meta = metadata(Some("t1"), Some("o1"), Some("p1"));
        let ctx = CallContext::from_metadata(meta, json!({})).unwrap();
        assert_eq!(ctx.template_id, "t1");
        assert_eq!(ctx.organization_id, "o1");
        assert_eq!(ctx.patient_id, "p1");
        assert!(ctx.intake_id.is_none());
    }

    #[test]
    fn test_missing_patient_id_fails() {
        let meta = metadata(Some("t1"), Some("o1"), None);
        let err = CallContext::from_metadata(meta, json!({})).unwrap_err();
        assert_eq!(err, ValidationError::MissingIdentity("patient_id"));
    }

    #[test]
    fn test_blank_identity_field_fails() {
        let meta = metadata(Some("t1"), Some("   "), Some("p1"));
        let err = CallContext::from_metadata(meta, json!({})).unwrap_err();
        assert_eq!(err, ValidationError::MissingIdentity("organization_id"));
    }

    #[test]
    fn test_blank_optional_fields_are_dropped() {
        let meta = CallMetadata {
            intake_id: Some("  ".to_string()),
            prefilled_greeting: Some(String::new()),
            ..metadata(Some("t1"), Some("o1"), Some("p1"))
        };
        let ctx = CallContext::from_metadata(meta, json!({})).unwrap();
        assert!(ctx.intake_id.is_none());
        assert!(ctx.prefilled_greeting.is_none());
    }

    #[test]
    fn test_payload_from_invalid_utf8_is_empty() {
        let payload = DispatchPayload::from_bytes(Some(&[0xff, 0xfe, 0xfd]));
        assert!(matches!(payload, DispatchPayload::Empty));
    }

    #[test]
    fn test_payload_from_blank_text_is_empty() {
        assert!(matches!(
            DispatchPayload::from_text(Some("   ")),
            DispatchPayload::Empty
        ));
        assert!(matches!(DispatchPayload::from_text(None), DispatchPayload::Empty));
    }

    #[test]
    fn test_metadata_wire_roundtrip() {
        let json = json!({
            "template_id": "t1",
            "organization_id": "o1",
            "patient_id": "p1",
            "intake_id": "i1",
            "phone_number": "+12145550100",
            "prefilled_greeting": "Hello!"
        });
        let meta: CallMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(meta.intake_id.as_deref(), Some("i1"));
        assert_eq!(meta.prefilled_greeting.as_deref(), Some("Hello!"));
    }
}
