//! Dispatch metadata parsing
//!
//! Turns a raw, shape-ambiguous dispatch payload into a validated call
//! context. Only a missing identity field is fatal; every malformed shape
//! degrades to an empty context with a logged diagnostic.

use serde_json::{Map, Value};

use intake_agent_config::AgentSettings;
use intake_agent_core::{CallContext, CallMetadata, DispatchPayload, ValidationError};

/// Fixed ids substituted by the placeholder-identity mode.
const PLACEHOLDER_TEMPLATE_ID: &str = "template-local-test";
const PLACEHOLDER_ORGANIZATION_ID: &str = "organization-local-test";
const PLACEHOLDER_PATIENT_ID: &str = "patient-local-test";

/// Parse a dispatch payload into a call context.
///
/// Fails only when an identity field is still missing after default
/// substitution (and after placeholder substitution, when that mode is
/// explicitly enabled).
pub fn parse_dispatch_payload(
    payload: DispatchPayload,
    settings: &AgentSettings,
) -> Result<CallContext, ValidationError> {
    let object = resolve(payload);
    let mut meta = extract_metadata(&object);

    if settings.allow_placeholder_identity {
        substitute_placeholders(&mut meta);
    }

    CallContext::from_metadata(meta, Value::Object(object))
}

/// Resolve the payload to a JSON object, degrading every other shape.
fn resolve(payload: DispatchPayload) -> Map<String, Value> {
    match payload {
        DispatchPayload::Empty => {
            tracing::info!("dispatch carried no metadata");
            Map::new()
        }
        DispatchPayload::Raw(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!("metadata JSON was not an object ({})", json_kind(&other));
                Map::new()
            }
            Err(e) => {
                tracing::warn!("metadata text was not valid JSON: {e}");
                Map::new()
            }
        },
        DispatchPayload::Structured(Value::Object(map)) => map,
        DispatchPayload::Structured(other) => {
            tracing::warn!(
                "structured metadata was not an object ({})",
                json_kind(&other)
            );
            Map::new()
        }
    }
}

/// Pull the known wire fields out of the object. A field of the wrong type
/// counts as missing, not as an error.
fn extract_metadata(object: &Map<String, Value>) -> CallMetadata {
    CallMetadata {
        template_id: string_field(object, "template_id"),
        organization_id: string_field(object, "organization_id"),
        patient_id: string_field(object, "patient_id"),
        intake_id: string_field(object, "intake_id"),
        phone_number: string_field(object, "phone_number"),
        prefilled_greeting: string_field(object, "prefilled_greeting"),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            tracing::warn!(
                "metadata field '{key}' has unexpected type ({}), ignoring",
                json_kind(other)
            );
            None
        }
    }
}

fn substitute_placeholders(meta: &mut CallMetadata) {
    substitute(&mut meta.template_id, "template_id", PLACEHOLDER_TEMPLATE_ID);
    substitute(
        &mut meta.organization_id,
        "organization_id",
        PLACEHOLDER_ORGANIZATION_ID,
    );
    substitute(&mut meta.patient_id, "patient_id", PLACEHOLDER_PATIENT_ID);
}

fn substitute(field: &mut Option<String>, name: &str, placeholder: &str) {
    let missing = field.as_deref().map_or(true, |v| v.trim().is_empty());
    if missing {
        tracing::warn!("substituting placeholder {name} for local testing");
        *field = Some(placeholder.to_string());
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
