//! Transcript persistence
//!
//! Runs after the call has concluded, so storage failure is
//! logged-but-non-fatal and must never prevent span closure.

use intake_agent_core::{RecordStore, Transcript};

/// Persist the transcript as a keyed overwrite on the intake record.
///
/// Without an intake id there is nothing to key the write by: skip with a
/// warning, zero store writes. Returns whether a write happened and
/// succeeded.
pub async fn persist_transcript(
    records: &dyn RecordStore,
    intake_id: Option<&str>,
    transcript: &Transcript,
) -> bool {
    let Some(intake_id) = intake_id else {
        tracing::warn!("no intake id on this call, skipping transcript persistence");
        return false;
    };

    match records.save_transcript(intake_id, &transcript.to_value()).await {
        Ok(()) => {
            tracing::info!(
                intake_id = %intake_id,
                turns = transcript.turn_count(),
                "transcript persisted"
            );
            true
        }
        Err(e) => {
            tracing::error!(intake_id = %intake_id, "transcript persistence failed: {e}");
            false
        }
    }
}
