//! Record store HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use intake_agent_core::{
    OrganizationRecord, PatientRecord, RecordStore, StoreError, TemplateRecord,
};

/// Response envelope returned by every record store endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    success: bool,

    #[serde(default)]
    message: Option<String>,

    #[serde(default, alias = "template", alias = "patient", alias = "organization")]
    record: Option<T>,
}

/// HTTP client for the record store API.
#[derive(Clone)]
pub struct RecordApiClient {
    base_url: String,
    http: Client,
}

impl RecordApiClient {
    /// Build a client with a per-request timeout bounding the pre-connect
    /// stage.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!("HTTP {}", response.status())));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        if !envelope.success {
            return Err(StoreError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            ));
        }
        envelope
            .record
            .ok_or_else(|| StoreError::InvalidData(format!("missing record payload for {path}")))
    }
}

#[async_trait]
impl RecordStore for RecordApiClient {
    async fn template(&self, template_id: &str) -> Result<TemplateRecord, StoreError> {
        self.fetch(&format!("/templates/{template_id}")).await
    }

    async fn patient(&self, patient_id: &str) -> Result<PatientRecord, StoreError> {
        self.fetch(&format!("/patients/{patient_id}")).await
    }

    async fn organization(
        &self,
        organization_id: &str,
    ) -> Result<OrganizationRecord, StoreError> {
        self.fetch(&format!("/organizations/{organization_id}")).await
    }

    async fn save_transcript(
        &self,
        intake_id: &str,
        transcript: &Value,
    ) -> Result<(), StoreError> {
        let url = format!("{}/intakes/{}/transcription", self.base_url, intake_id);
        let response = self
            .http
            .put(&url)
            .json(&serde_json::json!({ "transcription": transcript }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!("HTTP {}", response.status())));
        }

        tracing::debug!(intake_id = %intake_id, "transcript saved to record store");
        Ok(())
    }
}
