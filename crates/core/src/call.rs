//! Call lifecycle types

use serde::{Deserialize, Serialize};

/// Session lifecycle stage.
///
/// Transitions are forward-only; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Pre-connect work: metadata, enrichment, instruction compilation.
    DispatchFetch,
    /// Voice channel opens and the greeting is spoken.
    Greeting,
    /// The external voice pipeline drives the scripted dialogue.
    ActiveIntake,
    /// Guaranteed cleanup: persistence, span closure.
    Shutdown,
    Closed,
}

impl SessionState {
    /// Forward-only transition check.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        next > self
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SessionState::DispatchFetch => "dispatch_fetch",
            SessionState::Greeting => "greeting",
            SessionState::ActiveIntake => "active_intake",
            SessionState::Shutdown => "shutdown",
            SessionState::Closed => "closed",
        }
    }
}

/// Best-effort display data used to personalize the script.
///
/// Each field is independently nullable; a missing name never blocks
/// downstream use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub patient_name: Option<String>,
    pub organization_name: Option<String>,
}

impl EnrichmentResult {
    pub fn patient_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.patient_name.as_deref().unwrap_or(default)
    }

    pub fn organization_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.organization_name.as_deref().unwrap_or(default)
    }
}

/// Which compiler tier produced the final script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionTier {
    /// Remote prompt store, fetched by name + deployment label.
    RemotePrompt,
    /// Structured template record rendered locally.
    TemplateRecord,
    /// Fixed static script; this tier cannot fail.
    StaticDefault,
}

impl InstructionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            InstructionTier::RemotePrompt => "remote_prompt",
            InstructionTier::TemplateRecord => "template_record",
            InstructionTier::StaticDefault => "static_default",
        }
    }
}

/// The full script handed to the conversational engine.
///
/// `text` is never empty.
#[derive(Debug, Clone)]
pub struct CompiledInstructions {
    pub text: String,
    pub tier: InstructionTier,
}

/// Summary of a finished call session.
#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    pub session_id: String,
    pub tier: InstructionTier,
    pub turn_count: usize,
    pub transcript_persisted: bool,
}
