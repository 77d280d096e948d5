//! Error types for the intake calling agent

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the intake calling agent
#[derive(Error, Debug)]
pub enum Error {
    // Metadata validation errors (fatal: abort before Greeting)
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    // Record store errors
    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    // Prompt store / compilation errors
    #[error("prompt store error: {0}")]
    Prompt(#[from] PromptError),

    // Dispatch/telephony errors
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // Voice channel errors
    #[error("voice transport error: {0}")]
    Transport(#[from] TransportError),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a generic error from a string
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}

/// A required identity field is missing from the dispatch metadata.
///
/// The only error category that aborts a call session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required identity field: {0}")]
    MissingIdentity(&'static str),
}

/// Record store lookup/write failures.
///
/// Recovered at call sites by substituting a configured default; a
/// non-success response and a transport error are treated identically.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid payload: {0}")]
    InvalidData(String),
}

/// Prompt store and template compilation failures.
///
/// Recovered by falling through to the next compiler tier.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("prompt not found: {name} (label {label})")]
    NotFound { name: String, label: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("compiled prompt was empty")]
    Empty,
}

/// Dispatch/telephony failures.
///
/// The trigger endpoint maps these to a gateway error response.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("job dispatch failed: {0}")]
    Job(String),

    #[error("telephony leg failed: {0}")]
    Telephony(String),

    #[error("outbound trunk is not configured")]
    MissingTrunk,
}

/// Voice channel failures, owned by the external pipeline.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("channel error: {0}")]
    Channel(String),

    #[error("channel closed")]
    Closed,
}
