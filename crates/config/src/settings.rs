//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::greetings::GreetingTemplates;
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-call agent behavior
    #[serde(default)]
    pub agent: AgentSettings,

    /// External store endpoints
    #[serde(default)]
    pub stores: StoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.worker_name.trim().is_empty() {
            return Err(ConfigError::MissingField("agent.worker_name".to_string()));
        }
        if self.agent.agent_name.trim().is_empty() {
            return Err(ConfigError::MissingField("agent.agent_name".to_string()));
        }
        if self.stores.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stores.request_timeout_secs".to_string(),
                message: "must be at least 1 second".to_string(),
            });
        }
        if self.stores.record_store_url.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "stores.record_store_url".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
        }
    }
}

/// Per-call agent behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Worker name registered with the dispatch service.
    #[serde(default = "default_worker_name")]
    pub worker_name: String,

    /// Name the agent introduces itself with.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Display name used when the patient lookup fails.
    #[serde(default = "default_patient_name")]
    pub default_patient_name: String,

    /// Display name used when the organization lookup fails.
    #[serde(default = "default_organization_name")]
    pub default_organization_name: String,

    /// Pause before the greeting so the first audio frame is not clipped.
    #[serde(default = "default_greeting_pause_ms")]
    pub greeting_pause_ms: u64,

    /// Substitute fixed placeholder ids when identity fields are missing.
    /// For local testing only; never enabled implicitly.
    #[serde(default)]
    pub allow_placeholder_identity: bool,

    /// Path to the VAD model loaded once at process start.
    #[serde(default = "default_vad_model_path")]
    pub vad_model_path: String,

    /// Greeting template set.
    #[serde(default)]
    pub greetings: GreetingTemplates,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            worker_name: default_worker_name(),
            agent_name: default_agent_name(),
            default_patient_name: default_patient_name(),
            default_organization_name: default_organization_name(),
            greeting_pause_ms: default_greeting_pause_ms(),
            allow_placeholder_identity: false,
            vad_model_path: default_vad_model_path(),
            greetings: GreetingTemplates::default(),
        }
    }
}

/// External store endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Record store base URL (templates, patients, organizations, intakes).
    #[serde(default = "default_record_store_url")]
    pub record_store_url: String,

    /// Prompt store base URL; absent disables the remote prompt tier.
    #[serde(default)]
    pub prompt_store_url: Option<String>,

    /// Prompt fetched from the prompt store.
    #[serde(default = "default_prompt_name")]
    pub prompt_name: String,

    /// Deployment label of the prompt.
    #[serde(default = "default_prompt_label")]
    pub prompt_label: String,

    /// Dispatch/telephony API base URL.
    #[serde(default = "default_dispatch_url")]
    pub dispatch_url: String,

    /// Outbound telephony trunk id.
    #[serde(default)]
    pub outbound_trunk_id: Option<String>,

    /// Span collector endpoint; absent disables span export.
    #[serde(default)]
    pub span_collector_url: Option<String>,

    /// Upper bound on each store request during the pre-connect stage.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            record_store_url: default_record_store_url(),
            prompt_store_url: None,
            prompt_name: default_prompt_name(),
            prompt_label: default_prompt_label(),
            dispatch_url: default_dispatch_url(),
            outbound_trunk_id: None,
            span_collector_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// OTLP collector endpoint; absent disables trace export.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Enable trace export when an endpoint is configured.
    #[serde(default = "default_true")]
    pub tracing_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            otlp_endpoint: None,
            tracing_enabled: true,
        }
    }
}

/// Load settings from an optional file plus environment overrides.
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path).required(false));
    }
    let config = builder
        .add_source(Environment::with_prefix("INTAKE_AGENT").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_worker_name() -> String {
    "intake-agent".to_string()
}

fn default_agent_name() -> String {
    "Alex".to_string()
}

fn default_patient_name() -> String {
    "there".to_string()
}

fn default_organization_name() -> String {
    "your medical office".to_string()
}

fn default_greeting_pause_ms() -> u64 {
    500
}

fn default_vad_model_path() -> String {
    "models/vad.onnx".to_string()
}

fn default_record_store_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_prompt_name() -> String {
    "intake-call".to_string()
}

fn default_prompt_label() -> String {
    "production".to_string()
}

fn default_dispatch_url() -> String {
    "http://localhost:7880".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.agent.worker_name, "intake-agent");
        assert_eq!(settings.agent.greeting_pause_ms, 500);
        assert!(!settings.agent.allow_placeholder_identity);
        assert!(settings.stores.prompt_store_url.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::default();
        settings.stores.request_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_blank_worker_name_rejected() {
        let mut settings = Settings::default();
        settings.agent.worker_name = " ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let settings: Settings =
            serde_json::from_str(r#"{"agent": {"agent_name": "Maya"}}"#).unwrap();
        assert_eq!(settings.agent.agent_name, "Maya");
        assert_eq!(settings.agent.worker_name, "intake-agent");
        assert_eq!(settings.server.port, 8080);
    }
}
