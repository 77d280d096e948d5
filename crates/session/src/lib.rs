//! Call-session orchestration for the intake calling agent
//!
//! This crate holds the coordination logic that runs per dispatched call:
//! parsing untrusted dispatch metadata, fetching enrichment data in
//! parallel with partial-failure tolerance, compiling the conversation
//! script through a tiered fallback chain, driving the session lifecycle,
//! and guaranteeing transcript persistence plus span closure on every exit
//! path.

pub mod enrichment;
pub mod instructions;
pub mod metadata;
pub mod session;
pub mod span;
pub mod transcript;
pub mod voice;

pub use enrichment::fetch_enrichment;
pub use instructions::{InstructionCompiler, SKIP_REINTRODUCTION_DIRECTIVE};
pub use metadata::parse_dispatch_payload;
pub use session::{run_call, CallSession, SessionDeps};
pub use span::SessionSpan;
pub use transcript::persist_transcript;
pub use voice::{SimulatedVoiceChannel, SimulatedVoiceConnector};

#[cfg(test)]
pub(crate) mod testing;
