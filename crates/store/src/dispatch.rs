//! Dispatch and telephony client
//!
//! Creates the remote job plus the telephony leg for an outbound call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use intake_agent_core::{DispatchError, DispatchInfo, DispatchRequest, Dispatcher};

/// HTTP client for the dispatch/telephony API.
#[derive(Clone)]
pub struct DispatchApiClient {
    base_url: String,
    outbound_trunk_id: Option<String>,
    http: Client,
}

impl DispatchApiClient {
    pub fn new(
        base_url: impl Into<String>,
        outbound_trunk_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Job(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            outbound_trunk_id,
            http,
        })
    }
}

#[async_trait]
impl Dispatcher for DispatchApiClient {
    async fn create_dispatch(
        &self,
        request: &DispatchRequest,
    ) -> Result<DispatchInfo, DispatchError> {
        let url = format!("{}/dispatches", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| DispatchError::Job(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::Job(format!("HTTP {}", response.status())));
        }

        let info: DispatchInfo = response
            .json()
            .await
            .map_err(|e| DispatchError::Job(e.to_string()))?;

        tracing::info!(
            dispatch_id = %info.dispatch_id,
            room = %request.room_name,
            "created dispatch"
        );
        Ok(info)
    }

    async fn dial(&self, room_name: &str, phone_number: &str) -> Result<(), DispatchError> {
        let trunk = self
            .outbound_trunk_id
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(DispatchError::MissingTrunk)?;

        let url = format!("{}/telephony/calls", self.base_url);
        let body = serde_json::json!({
            "room_name": room_name,
            "trunk_id": trunk,
            "call_to": phone_number,
            "participant_identity": "phone_user",
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Telephony(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::Telephony(format!(
                "HTTP {}",
                response.status()
            )));
        }

        tracing::info!(room = %room_name, phone = %phone_number, "telephony leg created");
        Ok(())
    }
}
