//! Parallel enrichment lookups
//!
//! Fetches the patient and organization display names concurrently. Each
//! lookup is wrapped so its failure cannot affect the other; the join waits
//! for both regardless, so total latency tracks the slower lookup rather
//! than the sum.

use intake_agent_core::{EnrichmentResult, RecordStore};

/// Fetch both display names, capturing per-lookup failure as absence.
pub async fn fetch_enrichment(
    records: &dyn RecordStore,
    patient_id: &str,
    organization_id: &str,
) -> EnrichmentResult {
    let patient = async {
        match records.patient(patient_id).await {
            Ok(record) => non_blank(record.full_name),
            Err(e) => {
                tracing::warn!(patient_id = %patient_id, "patient lookup failed: {e}");
                None
            }
        }
    };

    let organization = async {
        match records.organization(organization_id).await {
            Ok(record) => non_blank(record.name),
            Err(e) => {
                tracing::warn!(
                    organization_id = %organization_id,
                    "organization lookup failed: {e}"
                );
                None
            }
        }
    };

    let (patient_name, organization_name) = tokio::join!(patient, organization);
    EnrichmentResult {
        patient_name,
        organization_name,
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
