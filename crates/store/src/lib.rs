//! HTTP clients for the intake agent's external services
//!
//! The record store, the prompt-template store, the dispatch/telephony API,
//! and the span collector are all JSON-over-HTTP services. Every client
//! folds transport failures and non-success responses into the core error
//! taxonomy so call sites can degrade uniformly.

pub mod client;
pub mod dispatch;
pub mod prompt;
pub mod spans;

pub use client::RecordApiClient;
pub use dispatch::DispatchApiClient;
pub use prompt::{compile_template, PromptApiClient};
pub use spans::HttpSpanExporter;
