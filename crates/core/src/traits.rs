//! Trait seams for external collaborators
//!
//! Every service the call session talks to sits behind one of these traits:
//! - [`RecordStore`]: keyed fetch/update access to patient, organization,
//!   template, and intake records
//! - [`PromptStore`]: remote prompt templates fetched by name + label
//! - [`Dispatcher`]: remote job creation plus the telephony leg
//! - [`VoiceChannel`] / [`VoiceConnector`]: the external voice pipeline
//! - [`SpanExporter`]: sink for closed observability spans

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, PromptError, StoreError, TransportError};
use crate::records::{OrganizationRecord, PatientRecord, TemplateRecord};
use crate::span::SpanRecord;
use crate::transcript::TranscriptTurn;
use crate::vad::VadHandle;

/// Keyed fetch/update access to the external record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn template(&self, template_id: &str) -> Result<TemplateRecord, StoreError>;

    async fn patient(&self, patient_id: &str) -> Result<PatientRecord, StoreError>;

    async fn organization(&self, organization_id: &str)
        -> Result<OrganizationRecord, StoreError>;

    /// Keyed overwrite of the transcript stored on an intake record.
    async fn save_transcript(&self, intake_id: &str, transcript: &Value)
        -> Result<(), StoreError>;
}

/// Named variables injected into a remote prompt template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptVariables {
    pub patient_name: String,
    pub organization_name: String,
    pub template_name: String,
    pub ai_instructions: String,
    pub question_list: String,
}

impl PromptVariables {
    /// Variables as a name → value map for placeholder substitution.
    pub fn as_map(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("patient_name", self.patient_name.as_str()),
            ("organization_name", self.organization_name.as_str()),
            ("template_name", self.template_name.as_str()),
            ("ai_instructions", self.ai_instructions.as_str()),
            ("question_list", self.question_list.as_str()),
        ])
    }
}

/// Remote prompt-template store, fetched by a fixed name + deployment label.
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Fetch and compile the prompt with the given variables.
    async fn compiled_prompt(
        &self,
        name: &str,
        label: &str,
        variables: &PromptVariables,
    ) -> Result<String, PromptError>;
}

/// Request to create a remote job plus a telephony leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub agent_name: String,
    pub room_name: String,
    pub phone_number: String,
    pub metadata: Value,
}

/// Handle returned by a successful dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchInfo {
    pub dispatch_id: String,
}

/// Creates the remote job and dials the telephony leg for an outbound call.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn create_dispatch(&self, request: &DispatchRequest)
        -> Result<DispatchInfo, DispatchError>;

    async fn dial(&self, room_name: &str, phone_number: &str) -> Result<(), DispatchError>;
}

/// Voice channel into one call room. Implemented by the external pipeline.
#[async_trait]
pub trait VoiceChannel: Send + Sync {
    /// Open the channel to the room.
    async fn open(&self) -> Result<(), TransportError>;

    /// Speak text to the remote participant.
    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<(), TransportError>;

    /// Resolve when the remote side disconnects.
    async fn disconnected(&self);

    /// Ordered transcript turns observed so far.
    fn transcript(&self) -> Vec<TranscriptTurn>;

    /// Tear the channel down.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds a voice channel for a dispatched room.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn connect(
        &self,
        room_name: &str,
        vad: &VadHandle,
    ) -> Result<Arc<dyn VoiceChannel>, TransportError>;
}

/// Sink for closed observability spans.
#[async_trait]
pub trait SpanExporter: Send + Sync {
    async fn export(&self, record: &SpanRecord) -> Result<(), StoreError>;
}
