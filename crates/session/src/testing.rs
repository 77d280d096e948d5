//! Shared test doubles

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use intake_agent_config::AgentSettings;
use intake_agent_core::{
    CallContext, CallMetadata, OrganizationRecord, PatientRecord, PromptError, PromptStore,
    PromptVariables, RecordStore, SpanExporter, SpanRecord, StoreError, TemplateQuestion,
    TemplateRecord, VadHandle,
};

use crate::session::SessionDeps;
use crate::voice::SimulatedVoiceConnector;

/// Record store double. Lookups fail unless a name/template is configured.
#[derive(Default)]
pub(crate) struct MockRecordStore {
    patient_name: Option<String>,
    organization_name: Option<String>,
    template: Option<TemplateRecord>,
    lookup_delay: Option<Duration>,
    fail_saves: bool,
    pub saves: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockRecordStore {
    pub fn with_patient(mut self, full_name: &str) -> Self {
        self.patient_name = Some(full_name.to_string());
        self
    }

    pub fn with_organization(mut self, name: &str) -> Self {
        self.organization_name = Some(name.to_string());
        self
    }

    pub fn with_template(mut self, template: TemplateRecord) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn with_failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    async fn delay(&self) {
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn template(&self, template_id: &str) -> Result<TemplateRecord, StoreError> {
        self.template
            .clone()
            .ok_or_else(|| StoreError::NotFound(template_id.to_string()))
    }

    async fn patient(&self, patient_id: &str) -> Result<PatientRecord, StoreError> {
        self.delay().await;
        match &self.patient_name {
            Some(name) => Ok(PatientRecord {
                id: patient_id.to_string(),
                full_name: name.clone(),
                phone: None,
                date_of_birth: None,
                email: None,
                gender: None,
            }),
            None => Err(StoreError::Transport("connection refused".to_string())),
        }
    }

    async fn organization(
        &self,
        organization_id: &str,
    ) -> Result<OrganizationRecord, StoreError> {
        self.delay().await;
        match &self.organization_name {
            Some(name) => Ok(OrganizationRecord {
                id: organization_id.to_string(),
                name: name.clone(),
                phone: None,
            }),
            None => Err(StoreError::NotFound(organization_id.to_string())),
        }
    }

    async fn save_transcript(
        &self,
        intake_id: &str,
        transcript: &Value,
    ) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Transport("write failed".to_string()));
        }
        self.saves
            .lock()
            .push((intake_id.to_string(), transcript.clone()));
        Ok(())
    }
}

/// Prompt store double that either returns fixed compiled text or fails.
pub(crate) struct MockPromptStore {
    text: Option<String>,
    pub requests: Arc<Mutex<Vec<(String, String, PromptVariables)>>>,
}

impl MockPromptStore {
    pub fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl PromptStore for MockPromptStore {
    async fn compiled_prompt(
        &self,
        name: &str,
        label: &str,
        variables: &PromptVariables,
    ) -> Result<String, PromptError> {
        self.requests
            .lock()
            .push((name.to_string(), label.to_string(), variables.clone()));
        self.text
            .clone()
            .ok_or_else(|| PromptError::Transport("prompt store unavailable".to_string()))
    }
}

/// Span exporter double recording every exported record.
#[derive(Default)]
pub(crate) struct RecordingSpanExporter {
    fail: bool,
    pub exports: Arc<Mutex<Vec<SpanRecord>>>,
}

impl RecordingSpanExporter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            exports: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SpanExporter for RecordingSpanExporter {
    async fn export(&self, record: &SpanRecord) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Transport("collector unavailable".to_string()));
        }
        self.exports.lock().push(record.clone());
        Ok(())
    }
}

pub(crate) fn template_fixture() -> TemplateRecord {
    TemplateRecord {
        id: "t1".to_string(),
        template_name: "General Intake Template".to_string(),
        template_type: Some("intake".to_string()),
        structure: Some("standard_medical_intake".to_string()),
        instructions_for_ai: "Be thorough but efficient.".to_string(),
        questions: vec![
            question("q1", "Can you please confirm your full name and date of birth?"),
            question("q2", "What is the main reason for your visit?"),
            question("q3", "Are you currently taking any medications?"),
        ],
    }
}

fn question(id: &str, text: &str) -> TemplateQuestion {
    TemplateQuestion {
        id: id.to_string(),
        question_text: text.to_string(),
        question_type: "text".to_string(),
        required: true,
        follow_up_questions: None,
        validation_rules: None,
    }
}

pub(crate) fn context_fixture() -> CallContext {
    let meta = CallMetadata {
        template_id: Some("t1".to_string()),
        organization_id: Some("o1".to_string()),
        patient_id: Some("p1".to_string()),
        intake_id: Some("i1".to_string()),
        ..CallMetadata::default()
    };
    CallContext::from_metadata(meta, json!({})).unwrap()
}

/// Builder for [`SessionDeps`] wired with test doubles.
pub(crate) struct DepsBuilder {
    records: Arc<MockRecordStore>,
    prompts: Option<Arc<MockPromptStore>>,
    spans: Option<Arc<RecordingSpanExporter>>,
    voice: Arc<dyn intake_agent_core::VoiceConnector>,
}

pub(crate) fn deps_with(
    records: MockRecordStore,
    prompts: Option<MockPromptStore>,
    spans: Option<Arc<RecordingSpanExporter>>,
) -> DepsBuilder {
    DepsBuilder {
        records: Arc::new(records),
        prompts: prompts.map(Arc::new),
        spans,
        voice: Arc::new(SimulatedVoiceConnector::new()),
    }
}

impl DepsBuilder {
    pub fn voice(mut self, voice: Arc<SimulatedVoiceConnector>) -> Self {
        self.voice = voice;
        self
    }

    pub fn build(self) -> SessionDeps {
        SessionDeps {
            records: self.records,
            prompts: self
                .prompts
                .map(|p| p as Arc<dyn PromptStore>),
            spans: self.spans.map(|s| s as Arc<dyn SpanExporter>),
            voice: self.voice,
            vad: VadHandle::disabled(),
            settings: AgentSettings::default(),
            prompt_name: "intake-call".to_string(),
            prompt_label: "production".to_string(),
        }
    }
}
