//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use intake_agent_config::Settings;
use intake_agent_core::{Dispatcher, PromptStore, RecordStore, SpanExporter, VadHandle, VoiceConnector};
use intake_agent_session::SessionDeps;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Record store client
    pub records: Arc<dyn RecordStore>,
    /// Prompt store client; absent disables the remote prompt tier.
    pub prompts: Option<Arc<dyn PromptStore>>,
    /// Span exporter; absent disables span export.
    pub spans: Option<Arc<dyn SpanExporter>>,
    /// Dispatch/telephony client
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Voice pipeline connector
    pub voice: Arc<dyn VoiceConnector>,
    /// VAD model, loaded once at process start.
    pub vad: VadHandle,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Settings,
        records: Arc<dyn RecordStore>,
        prompts: Option<Arc<dyn PromptStore>>,
        spans: Option<Arc<dyn SpanExporter>>,
        dispatcher: Arc<dyn Dispatcher>,
        voice: Arc<dyn VoiceConnector>,
        vad: VadHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            records,
            prompts,
            spans,
            dispatcher,
            voice,
            vad,
        }
    }

    /// Dependencies handed to each spawned call session.
    pub fn session_deps(&self) -> SessionDeps {
        SessionDeps {
            records: self.records.clone(),
            prompts: self.prompts.clone(),
            spans: self.spans.clone(),
            voice: self.voice.clone(),
            vad: self.vad.clone(),
            settings: self.config.agent.clone(),
            prompt_name: self.config.stores.prompt_name.clone(),
            prompt_label: self.config.stores.prompt_label.clone(),
        }
    }
}
