//! Intake Agent Server
//!
//! HTTP surface for the worker: the dispatch trigger endpoint, the job
//! assignment endpoint that spawns call sessions, and health probes.

pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to dispatch intake call")]
    Dispatch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<&ServerError> for axum::http::StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Dispatch(_) => axum::http::StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from(&self);
        let body = axum::Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
