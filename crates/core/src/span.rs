//! Observability span record

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observability record bracketing a call session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    pub session_id: String,
    pub opened_at: DateTime<Utc>,

    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl SpanRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            opened_at: Utc::now(),
            closed_at: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.closed_at
            .map(|closed| (closed - self.opened_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_record_attributes() {
        let mut record = SpanRecord::new("session-1");
        record.set("template_id", "t1");
        record.set("turn_count", 4);

        assert_eq!(record.attributes["template_id"], "t1");
        assert_eq!(record.attributes["turn_count"], 4);
        assert!(record.duration_ms().is_none());
    }

    #[test]
    fn test_span_record_duration() {
        let mut record = SpanRecord::new("session-1");
        record.closed_at = Some(record.opened_at + chrono::Duration::milliseconds(1500));
        assert_eq!(record.duration_ms(), Some(1500));
    }
}
