//! Core types and trait seams for the intake calling agent
//!
//! This crate provides the foundational pieces used across all other crates:
//! - Error taxonomy
//! - Dispatch metadata and call context types
//! - Record store payloads
//! - Transcript types
//! - Trait seams for every external collaborator
//! - The once-loaded VAD resource handle

pub mod call;
pub mod context;
pub mod error;
pub mod records;
pub mod span;
pub mod traits;
pub mod transcript;
pub mod vad;

pub use call::{CallReport, CompiledInstructions, EnrichmentResult, InstructionTier, SessionState};
pub use context::{CallContext, CallMetadata, DispatchPayload};
pub use error::{
    DispatchError, Error, PromptError, Result, StoreError, TransportError, ValidationError,
};
pub use records::{OrganizationRecord, PatientRecord, TemplateQuestion, TemplateRecord};
pub use span::SpanRecord;
pub use traits::{
    DispatchInfo, DispatchRequest, Dispatcher, PromptStore, PromptVariables, RecordStore,
    SpanExporter, VoiceChannel, VoiceConnector,
};
pub use transcript::{Transcript, TranscriptTurn, TurnRole};
pub use vad::{VadConfig, VadHandle};
