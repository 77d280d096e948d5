//! HTTP Endpoints
//!
//! REST API for the intake calling worker.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use intake_agent_core::{DispatchPayload, DispatchRequest};
use intake_agent_session::run_call;

use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Dispatch trigger
        .route("/intake-calls", post(schedule_intake_call))
        // Job assignment delivered to this worker
        .route("/jobs", post(accept_job))
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Request to trigger an outbound intake call
#[derive(Debug, Deserialize)]
pub struct IntakeCallRequest {
    /// Destination phone number in E.164 format
    pub phone_number: String,
    pub template_id: String,
    pub organization_id: String,
    pub patient_id: String,
    pub intake_id: String,
    /// Optional pre-composed greeting already delivered to the patient.
    #[serde(default)]
    pub greeting_override: Option<String>,
}

/// Response for an accepted intake call
#[derive(Debug, Serialize)]
pub struct IntakeCallResponse {
    pub status: &'static str,
    pub room_name: String,
    pub dispatch_id: Option<String>,
    pub metadata: Value,
    pub agent_name: String,
}

/// Trigger an intake call: create the remote job plus the telephony leg.
///
/// A synchronous dispatch failure maps to a gateway error.
async fn schedule_intake_call(
    State(state): State<AppState>,
    Json(request): Json<IntakeCallRequest>,
) -> Result<(StatusCode, Json<IntakeCallResponse>), ServerError> {
    if request.phone_number.trim().len() < 7 {
        return Err(ServerError::InvalidRequest(
            "phone_number must be in E.164 format".to_string(),
        ));
    }

    let short_id = uuid::Uuid::new_v4().simple().to_string();
    let room_name = format!("intake-{}", &short_id[..8]);

    let metadata = serde_json::json!({
        "template_id": request.template_id,
        "organization_id": request.organization_id,
        "patient_id": request.patient_id,
        "intake_id": request.intake_id,
        "phone_number": request.phone_number,
        "prefilled_greeting": request.greeting_override,
    });

    let agent_name = state.config.agent.worker_name.clone();
    let dispatch_request = DispatchRequest {
        agent_name: agent_name.clone(),
        room_name: room_name.clone(),
        phone_number: request.phone_number.clone(),
        metadata: metadata.clone(),
    };

    let dispatch = state
        .dispatcher
        .create_dispatch(&dispatch_request)
        .await
        .map_err(|e| {
            tracing::error!(intake_id = %request.intake_id, "dispatch creation failed: {e}");
            ServerError::Dispatch(e.to_string())
        })?;

    state
        .dispatcher
        .dial(&room_name, &request.phone_number)
        .await
        .map_err(|e| {
            tracing::error!(intake_id = %request.intake_id, "telephony leg failed: {e}");
            ServerError::Dispatch(e.to_string())
        })?;

    tracing::info!(
        room = %room_name,
        dispatch_id = %dispatch.dispatch_id,
        "intake call queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(IntakeCallResponse {
            status: "queued",
            room_name,
            dispatch_id: Some(dispatch.dispatch_id),
            metadata,
            agent_name,
        }),
    ))
}

/// Job assignment delivered to this worker
#[derive(Debug, Deserialize)]
pub struct JobAssignment {
    pub room_name: String,

    #[serde(default)]
    pub dispatch_id: Option<String>,

    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Accept a dispatched job and run the call session as its own task.
async fn accept_job(
    State(state): State<AppState>,
    Json(job): Json<JobAssignment>,
) -> (StatusCode, Json<Value>) {
    let payload = match job.metadata {
        Some(value) => DispatchPayload::Structured(value),
        None => DispatchPayload::Empty,
    };

    let deps = state.session_deps();
    let room_name = job.room_name.clone();
    tokio::spawn(async move {
        match run_call(&room_name, payload, deps).await {
            Ok(report) => tracing::info!(
                session_id = %report.session_id,
                turns = report.turn_count,
                persisted = report.transcript_persisted,
                "call session finished"
            ),
            Err(e) => tracing::error!(room = %room_name, "call session failed: {e}"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "accepted",
            "room_name": job.room_name,
            "dispatch_id": job.dispatch_id,
        })),
    )
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "vad_loaded": state.vad.is_loaded(),
    }))
}
