//! Call session state machine
//!
//! Sequences dispatch-time work, room entry and greeting, the active
//! intake stage, and shutdown. Stages advance forward only; shutdown
//! cleanup (transcript persistence, span closure) runs on every exit path,
//! including the validation abort before Greeting.

use std::sync::Arc;
use std::time::Duration;

use intake_agent_config::AgentSettings;
use intake_agent_core::{
    CallContext, CallReport, CompiledInstructions, DispatchPayload, Error, InstructionTier,
    PromptStore, RecordStore, Result, SessionState, SpanExporter, Transcript, VadHandle,
    VoiceChannel, VoiceConnector,
};

use crate::enrichment::fetch_enrichment;
use crate::instructions::InstructionCompiler;
use crate::metadata::parse_dispatch_payload;
use crate::span::SessionSpan;
use crate::transcript::persist_transcript;

/// Everything a call session needs from the outside world.
#[derive(Clone)]
pub struct SessionDeps {
    pub records: Arc<dyn RecordStore>,
    pub prompts: Option<Arc<dyn PromptStore>>,
    pub spans: Option<Arc<dyn SpanExporter>>,
    pub voice: Arc<dyn VoiceConnector>,
    pub vad: VadHandle,
    pub settings: AgentSettings,
    pub prompt_name: String,
    pub prompt_label: String,
}

type ShutdownHook = Box<dyn FnOnce() -> Result<()> + Send>;

/// One outbound intake call, driven as a single cooperative task.
pub struct CallSession {
    session_id: String,
    room_name: String,
    deps: SessionDeps,
    state: SessionState,
    span: SessionSpan,
    ctx: Option<CallContext>,
    instructions: Option<CompiledInstructions>,
    greeting: Option<String>,
    channel: Option<Arc<dyn VoiceChannel>>,
    shutdown_hook: Option<ShutdownHook>,
    persisted: bool,
    final_turns: usize,
}

impl CallSession {
    pub fn new(room_name: impl Into<String>, deps: SessionDeps) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let span = SessionSpan::open(deps.spans.clone(), &session_id);

        Self {
            session_id,
            room_name: room_name.into(),
            deps,
            state: SessionState::DispatchFetch,
            span,
            ctx: None,
            instructions: None,
            greeting: None,
            channel: None,
            shutdown_hook: None,
            persisted: false,
            final_turns: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn span(&self) -> &SessionSpan {
        &self.span
    }

    pub fn instructions(&self) -> Option<&CompiledInstructions> {
        self.instructions.as_ref()
    }

    /// Register the single shutdown subscriber.
    ///
    /// Invoked exactly once with no arguments when the session shuts down;
    /// its error is isolated from the session. A second registration
    /// replaces the first with a warning.
    pub fn set_shutdown_hook(&mut self, hook: impl FnOnce() -> Result<()> + Send + 'static) {
        if self.shutdown_hook.is_some() {
            tracing::warn!(session_id = %self.session_id, "replacing existing shutdown hook");
        }
        self.shutdown_hook = Some(Box::new(hook));
    }

    /// Drive the session to completion.
    ///
    /// Shutdown cleanup runs on every exit path; only a validation error
    /// surfaces to the caller.
    pub async fn run(&mut self, payload: DispatchPayload) -> Result<CallReport> {
        let outcome = self.try_run(payload).await;
        self.shutdown().await;
        outcome.map(|()| self.report())
    }

    async fn try_run(&mut self, payload: DispatchPayload) -> Result<()> {
        self.dispatch_fetch(payload).await?;
        self.greet().await?;
        self.active_intake().await;
        Ok(())
    }

    /// Pre-connect work: metadata, enrichment, instruction compilation.
    ///
    /// Trades a small fixed pre-connect delay for zero mid-call latency
    /// once the patient answers.
    async fn dispatch_fetch(&mut self, payload: DispatchPayload) -> Result<()> {
        tracing::info!(
            session_id = %self.session_id,
            room = %self.room_name,
            "dispatch received, starting pre-connect work"
        );
        self.span.set_attribute("room_name", self.room_name.clone());

        let ctx = parse_dispatch_payload(payload, &self.deps.settings).map_err(|e| {
            tracing::error!(
                session_id = %self.session_id,
                "fatal configuration error, aborting before greeting: {e}"
            );
            Error::from(e)
        })?;

        self.span.set_attribute("template_id", ctx.template_id.clone());
        self.span
            .set_attribute("organization_id", ctx.organization_id.clone());
        self.span.set_attribute("patient_id", ctx.patient_id.clone());
        if let Some(intake_id) = &ctx.intake_id {
            self.span.set_attribute("intake_id", intake_id.clone());
        }

        let enrichment = fetch_enrichment(
            self.deps.records.as_ref(),
            &ctx.patient_id,
            &ctx.organization_id,
        )
        .await;
        let patient_name = enrichment
            .patient_name_or(&self.deps.settings.default_patient_name)
            .to_string();
        let organization_name = enrichment
            .organization_name_or(&self.deps.settings.default_organization_name)
            .to_string();

        // The greeting is selected before compilation so the script can be
        // told the introduction is already covered by the time the engine
        // takes over.
        let greeting = match &ctx.prefilled_greeting {
            Some(line) => line.clone(),
            None => self.deps.settings.greetings.choose(
                &self.deps.settings.agent_name,
                &patient_name,
                &organization_name,
            ),
        };

        let compiler = InstructionCompiler::new(
            self.deps.records.clone(),
            self.deps.prompts.clone(),
            self.deps.prompt_name.clone(),
            self.deps.prompt_label.clone(),
        );
        let instructions = compiler
            .compile(&ctx, &patient_name, &organization_name, true)
            .await;

        self.span
            .set_attribute("instruction_tier", instructions.tier.as_str());
        tracing::info!(
            session_id = %self.session_id,
            tier = instructions.tier.as_str(),
            "instructions compiled"
        );

        self.ctx = Some(ctx);
        self.greeting = Some(greeting);
        self.instructions = Some(instructions);
        Ok(())
    }

    /// Open the voice channel and speak the greeting.
    async fn greet(&mut self) -> Result<()> {
        self.advance(SessionState::Greeting);

        let channel = self
            .deps
            .voice
            .connect(&self.room_name, &self.deps.vad)
            .await?;
        channel.open().await?;

        // Short fixed pause so the first audio frame is not clipped.
        tokio::time::sleep(Duration::from_millis(self.deps.settings.greeting_pause_ms)).await;

        let greeting = self.greeting.as_deref().unwrap_or_default();
        channel.say(greeting, true).await?;
        tracing::info!(session_id = %self.session_id, "greeting delivered");

        self.channel = Some(channel);
        Ok(())
    }

    /// The external voice pipeline drives the dialogue; this session only
    /// waits for the disconnect signal. Subscribing here, after Greeting,
    /// avoids any cancellation race against a still-running dispatch fetch.
    async fn active_intake(&mut self) {
        self.advance(SessionState::ActiveIntake);

        if let Some(channel) = &self.channel {
            tracing::debug!(
                session_id = %self.session_id,
                "intake handed to the voice pipeline, waiting for disconnect"
            );
            channel.disconnected().await;
            tracing::info!(session_id = %self.session_id, "remote participant disconnected");
        }
    }

    /// Guaranteed cleanup. Runs at most once; each step is isolated so the
    /// span always closes, last.
    async fn shutdown(&mut self) {
        if self.state >= SessionState::Shutdown {
            return;
        }
        self.advance(SessionState::Shutdown);

        if let Some(hook) = self.shutdown_hook.take() {
            if let Err(e) = hook() {
                tracing::warn!(session_id = %self.session_id, "shutdown hook failed: {e}");
            }
        }

        let transcript = match &self.channel {
            Some(channel) => Transcript::from_turns(channel.transcript()),
            None => Transcript::new(),
        };
        let intake_id = self.ctx.as_ref().and_then(|c| c.intake_id.as_deref());
        self.persisted =
            persist_transcript(self.deps.records.as_ref(), intake_id, &transcript).await;
        self.final_turns = transcript.turn_count();

        self.span
            .set_attribute("turn_count", transcript.turn_count() as i64);
        self.span.set_attribute("transcript", transcript.flatten());
        self.span
            .set_attribute("ended_at", chrono::Utc::now().to_rfc3339());
        self.span.close().await;

        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                tracing::warn!(session_id = %self.session_id, "voice channel close failed: {e}");
            }
        }

        self.advance(SessionState::Closed);
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(self.state.can_advance_to(next));
        tracing::debug!(
            session_id = %self.session_id,
            from = self.state.display_name(),
            to = next.display_name(),
            "session state change"
        );
        self.state = next;
    }

    fn report(&self) -> CallReport {
        CallReport {
            session_id: self.session_id.clone(),
            tier: self
                .instructions
                .as_ref()
                .map(|i| i.tier)
                .unwrap_or(InstructionTier::StaticDefault),
            turn_count: self.final_turns,
            transcript_persisted: self.persisted,
        }
    }
}

/// Run one dispatched call job to completion.
pub async fn run_call(
    room_name: &str,
    payload: DispatchPayload,
    deps: SessionDeps,
) -> Result<CallReport> {
    let mut session = CallSession::new(room_name, deps);
    session.run(payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::SKIP_REINTRODUCTION_DIRECTIVE;
    use crate::testing::{
        deps_with, template_fixture, MockPromptStore, MockRecordStore, RecordingSpanExporter,
    };
    use crate::voice::SimulatedVoiceConnector;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn full_metadata() -> DispatchPayload {
        DispatchPayload::Structured(json!({
            "template_id": "t1",
            "organization_id": "o1",
            "patient_id": "p1",
            "intake_id": "i1"
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_with_failing_enrichment_uses_defaults_and_persists() {
        // Both enrichment lookups fail; the greeting must fall back to the
        // configured default names and the transcript must land keyed by
        // the intake id.
        let exporter = Arc::new(RecordingSpanExporter::default());
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(200),
        ));
        let deps = deps_with(MockRecordStore::default(), None, Some(exporter.clone()))
            .voice(voice.clone());

        let report = run_call("intake-abc", full_metadata(), deps.build())
            .await
            .unwrap();

        assert_eq!(report.tier, InstructionTier::StaticDefault);
        assert!(report.transcript_persisted);
        assert!(report.turn_count >= 1);

        let channels = voice.channels();
        assert_eq!(channels.len(), 1);
        let greeting = &channels[0].spoken()[0];
        assert!(greeting.contains("there"), "greeting: {greeting}");
        assert!(greeting.contains("your medical office"), "greeting: {greeting}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transcript_persisted_keyed_by_intake_id() {
        let records = MockRecordStore::default();
        let saves = records.saves.clone();
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(records, None, None).voice(voice);

        run_call("intake-abc", full_metadata(), deps.build())
            .await
            .unwrap();

        let saves = saves.lock();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].0, "i1");
    }

    #[tokio::test]
    async fn test_missing_patient_id_aborts_before_greeting() {
        let exporter = Arc::new(RecordingSpanExporter::default());
        let voice = Arc::new(SimulatedVoiceConnector::new());
        let deps = deps_with(MockRecordStore::default(), None, Some(exporter.clone()))
            .voice(voice.clone());

        let payload = DispatchPayload::Structured(json!({
            "template_id": "t1",
            "organization_id": "o1"
        }));
        let err = run_call("intake-abc", payload, deps.build()).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        // No voice resource was engaged.
        assert!(voice.channels().is_empty());
        // The span still closed, exactly once.
        assert_eq!(exporter.exports.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_span_closes_even_when_persister_fails() {
        let exporter = Arc::new(RecordingSpanExporter::default());
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(
            MockRecordStore::default().with_failing_saves(),
            None,
            Some(exporter.clone()),
        )
        .voice(voice);

        let report = run_call("intake-abc", full_metadata(), deps.build())
            .await
            .unwrap();

        assert!(!report.transcript_persisted);
        let exports = exporter.exports.lock();
        assert_eq!(exports.len(), 1);
        assert!(exports[0].closed_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_intake_id_means_zero_store_writes() {
        let records = MockRecordStore::default();
        let saves = records.saves.clone();
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(records, None, None).voice(voice);

        let payload = DispatchPayload::Structured(json!({
            "template_id": "t1",
            "organization_id": "o1",
            "patient_id": "p1"
        }));
        let report = run_call("intake-abc", payload, deps.build()).await.unwrap();

        assert!(!report.transcript_persisted);
        assert!(saves.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefilled_greeting_overrides_random_choice() {
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(MockRecordStore::default(), None, None).voice(voice.clone());

        let payload = DispatchPayload::Structured(json!({
            "template_id": "t1",
            "organization_id": "o1",
            "patient_id": "p1",
            "prefilled_greeting": "Hi, it's the clinic again about tomorrow's visit."
        }));
        run_call("intake-abc", payload, deps.build()).await.unwrap();

        let spoken = voice.channels()[0].spoken();
        assert_eq!(
            spoken[0],
            "Hi, it's the clinic again about tomorrow's visit."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_instructions_always_carry_the_directive() {
        let records = MockRecordStore::default().with_template(template_fixture());
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(records, Some(MockPromptStore::failing()), None).voice(voice);

        let mut session = CallSession::new("intake-abc", deps.build());
        session.run(full_metadata()).await.unwrap();

        let instructions = session.instructions().unwrap();
        assert_eq!(instructions.tier, InstructionTier::TemplateRecord);
        assert!(instructions.text.ends_with(SKIP_REINTRODUCTION_DIRECTIVE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_hook_invoked_once_and_errors_isolated() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(MockRecordStore::default(), None, None).voice(voice);

        let mut session = CallSession::new("intake-abc", deps.build());
        session.set_shutdown_hook(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Err(Error::other("hook blew up"))
        });

        let report = session.run(full_metadata()).await;
        assert!(report.is_ok());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_ends_closed_with_span_closed() {
        let voice = Arc::new(SimulatedVoiceConnector::with_auto_hangup(
            Duration::from_millis(100),
        ));
        let deps = deps_with(MockRecordStore::default(), None, None).voice(voice);

        let mut session = CallSession::new("intake-abc", deps.build());
        session.run(full_metadata()).await.unwrap();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.span().is_closed());
    }
}
