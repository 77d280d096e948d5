//! Session observability span
//!
//! One span brackets one call session. It opens at dispatch-fetch entry
//! when an exporter is configured and closes exactly once inside the
//! shutdown path.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use intake_agent_core::{SpanExporter, SpanRecord};

/// Span for one call session.
pub struct SessionSpan {
    exporter: Option<Arc<dyn SpanExporter>>,
    record: SpanRecord,
    closed: bool,
}

impl SessionSpan {
    /// Open a span. A `None` exporter is the valid disabled mode: attribute
    /// bookkeeping still happens, nothing is exported.
    pub fn open(exporter: Option<Arc<dyn SpanExporter>>, session_id: &str) -> Self {
        Self {
            exporter,
            record: SpanRecord::new(session_id),
            closed: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.exporter.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn record(&self) -> &SpanRecord {
        &self.record
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) {
        if self.closed {
            tracing::warn!(key = %key, "attribute set on closed span ignored");
            return;
        }
        self.record.set(key, value);
    }

    /// End and flush the span.
    ///
    /// Runs exactly once; later calls are no-ops. Export failure is logged
    /// and swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            tracing::warn!(session_id = %self.record.session_id, "span already closed");
            return;
        }
        self.closed = true;
        self.record.closed_at = Some(Utc::now());

        if let Some(exporter) = &self.exporter {
            if let Err(e) = exporter.export(&self.record).await {
                tracing::warn!(
                    session_id = %self.record.session_id,
                    "span export failed: {e}"
                );
            }
        }

        tracing::debug!(
            session_id = %self.record.session_id,
            duration_ms = ?self.record.duration_ms(),
            "session span closed"
        );
    }
}
