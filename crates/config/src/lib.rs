//! Configuration management for the intake calling agent
//!
//! Supports loading configuration from:
//! - TOML/YAML files
//! - Environment variables (INTAKE_AGENT__ prefix)

pub mod greetings;
pub mod settings;

pub use greetings::GreetingTemplates;
pub use settings::{
    load_settings, AgentSettings, ObservabilityConfig, ServerConfig, Settings, StoreConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
