//! Instruction compilation
//!
//! Produces the full script handed to the conversational engine through an
//! ordered fallback chain: the remote prompt store, then the structured
//! template record rendered locally, then a fixed static script. Each tier
//! catches its own failure and falls through; only the static tier is
//! unconditionally guaranteed.

use std::fmt::Write as _;
use std::sync::Arc;

use intake_agent_core::{
    CallContext, CompiledInstructions, InstructionTier, PromptError, PromptStore,
    PromptVariables, RecordStore, TemplateQuestion, TemplateRecord,
};

/// Base conduct rules shared by every tier.
const BASE_INSTRUCTIONS: &str = "\
You are a professional medical intake agent calling a patient to collect \
information before an upcoming appointment.

Conversation flow:
1. Greet the patient warmly and confirm they have a few minutes to talk.
2. Work through the questions below in order.
3. Thank the patient and confirm their appointment details.

Rules:
- Never provide medical advice or a diagnosis.
- If asked a medical question, politely redirect the patient to their doctor.
- Keep responses concise but complete.
- Use a natural conversation flow, not robotic questioning.
- Confirm each answer before moving to the next question.
- If the patient seems confused, explain what you are doing and why.

Be conversational and show empathy so the patient feels comfortable sharing \
medical information.";

/// Question set used when no template can be fetched.
const DEFAULT_QUESTIONS: [&str; 8] = [
    "Can you please confirm your full name and date of birth?",
    "What is the main reason for your visit?",
    "Are you currently taking any medications?",
    "Please list all medications you are currently taking, including dosages.",
    "Do you have any known allergies?",
    "Please describe your allergies and any reactions you have had.",
    "Have you had any recent surgeries or hospitalizations?",
    "Please provide details about your recent surgeries or hospitalizations.",
];

/// Appended verbatim when the greeting has already been delivered to the
/// patient, whichever tier produced the base text.
pub const SKIP_REINTRODUCTION_DIRECTIVE: &str = "\n\n\
The patient has already been greeted on this call. Do not introduce yourself \
again and do not repeat the greeting. Wait for the patient's reply, then \
continue with the questions.";

/// Ordered fallback compiler for per-call conversation scripts.
pub struct InstructionCompiler {
    records: Arc<dyn RecordStore>,
    prompts: Option<Arc<dyn PromptStore>>,
    prompt_name: String,
    prompt_label: String,
}

impl InstructionCompiler {
    pub fn new(
        records: Arc<dyn RecordStore>,
        prompts: Option<Arc<dyn PromptStore>>,
        prompt_name: impl Into<String>,
        prompt_label: impl Into<String>,
    ) -> Self {
        Self {
            records,
            prompts,
            prompt_name: prompt_name.into(),
            prompt_label: prompt_label.into(),
        }
    }

    /// Compile the script for one call.
    ///
    /// `greeting_delivered` appends the skip-reintroduction directive to the
    /// output of whichever tier wins.
    pub async fn compile(
        &self,
        ctx: &CallContext,
        patient_name: &str,
        organization_name: &str,
        greeting_delivered: bool,
    ) -> CompiledInstructions {
        // The template record feeds tier 1 variables and tier 2 rendering.
        let template = match self.records.template(&ctx.template_id).await {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(template_id = %ctx.template_id, "template fetch failed: {e}");
                None
            }
        };

        if let Some(prompts) = &self.prompts {
            match self
                .remote_prompt(
                    prompts.as_ref(),
                    template.as_ref(),
                    patient_name,
                    organization_name,
                )
                .await
            {
                Ok(text) => {
                    return finish(text, InstructionTier::RemotePrompt, greeting_delivered)
                }
                Err(e) => {
                    tracing::warn!("remote prompt tier failed, falling through: {e}");
                }
            }
        }

        if let Some(template) = template.as_ref() {
            if template.questions.is_empty() {
                tracing::warn!(
                    template_id = %template.id,
                    "template record has no questions, falling through"
                );
            } else {
                return finish(
                    render_template(template),
                    InstructionTier::TemplateRecord,
                    greeting_delivered,
                );
            }
        }

        finish(
            static_script(),
            InstructionTier::StaticDefault,
            greeting_delivered,
        )
    }

    async fn remote_prompt(
        &self,
        prompts: &dyn PromptStore,
        template: Option<&TemplateRecord>,
        patient_name: &str,
        organization_name: &str,
    ) -> Result<String, PromptError> {
        let template = template
            .ok_or_else(|| PromptError::Render("template record unavailable".to_string()))?;

        let variables = PromptVariables {
            patient_name: patient_name.to_string(),
            organization_name: organization_name.to_string(),
            template_name: template.template_name.clone(),
            ai_instructions: template.instructions_for_ai.clone(),
            question_list: enumerate_questions(&template.questions),
        };

        let text = prompts
            .compiled_prompt(&self.prompt_name, &self.prompt_label, &variables)
            .await?;
        if text.trim().is_empty() {
            return Err(PromptError::Empty);
        }
        Ok(text)
    }
}

fn finish(
    mut text: String,
    tier: InstructionTier,
    greeting_delivered: bool,
) -> CompiledInstructions {
    if greeting_delivered {
        text.push_str(SKIP_REINTRODUCTION_DIRECTIVE);
    }
    CompiledInstructions { text, tier }
}

/// Tier 2: local rendering of a structured template record.
fn render_template(template: &TemplateRecord) -> String {
    let mut text = String::from(BASE_INSTRUCTIONS);
    if !template.instructions_for_ai.trim().is_empty() {
        let _ = write!(
            text,
            "\n\nTEMPLATE-SPECIFIC INSTRUCTIONS:\n{}",
            template.instructions_for_ai.trim()
        );
    }
    let _ = write!(
        text,
        "\n\nQUESTIONS TO ASK (in order):\n{}",
        enumerate_questions(&template.questions)
    );
    text
}

/// Questions as a numbered list.
fn enumerate_questions(questions: &[TemplateQuestion]) -> String {
    let mut list = String::new();
    for (i, question) in questions.iter().enumerate() {
        let _ = writeln!(list, "{}. {}", i + 1, question.question_text);
    }
    list
}

/// Tier 3: the static script. Never fails, never empty.
fn static_script() -> String {
    let mut text = String::from(BASE_INSTRUCTIONS);
    text.push_str("\n\nQUESTIONS TO ASK (in order):\n");
    for (i, question) in DEFAULT_QUESTIONS.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, question);
    }
    text
}
