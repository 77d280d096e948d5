//! HTTP span exporter
//!
//! Posts closed session spans to the configured collector endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use intake_agent_core::{SpanExporter, SpanRecord, StoreError};

/// Span exporter backed by an HTTP collector.
#[derive(Clone)]
pub struct HttpSpanExporter {
    endpoint: String,
    http: Client,
}

impl HttpSpanExporter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }
}

#[async_trait]
impl SpanExporter for HttpSpanExporter {
    async fn export(&self, record: &SpanRecord) -> Result<(), StoreError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!("HTTP {}", response.status())));
        }

        tracing::debug!(session_id = %record.session_id, "span exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_record_serializes_for_export() {
        let mut record = SpanRecord::new("session-1");
        record.set("turn_count", 3);

        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(body["session_id"], "session-1");
        assert_eq!(body["attributes"]["turn_count"], 3);
    }
}
