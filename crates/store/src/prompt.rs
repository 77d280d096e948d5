//! Prompt-template store client
//!
//! Fetches a prompt by name + deployment label and compiles it with named
//! variables. Any failure here makes the compiler fall through to the next
//! tier, so errors stay specific about what went wrong.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use intake_agent_core::{PromptError, PromptStore, PromptVariables};

#[derive(Debug, Deserialize)]
struct PromptEnvelope {
    success: bool,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    prompt: Option<PromptBody>,
}

#[derive(Debug, Deserialize)]
struct PromptBody {
    #[serde(default)]
    text: String,
}

/// HTTP client for the prompt store API.
#[derive(Clone)]
pub struct PromptApiClient {
    base_url: String,
    http: Client,
}

impl PromptApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PromptError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PromptError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl PromptStore for PromptApiClient {
    async fn compiled_prompt(
        &self,
        name: &str,
        label: &str,
        variables: &PromptVariables,
    ) -> Result<String, PromptError> {
        let url = format!("{}/prompts/{}?label={}", self.base_url, name, label);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PromptError::Transport(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PromptError::NotFound {
                name: name.to_string(),
                label: label.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(PromptError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let envelope: PromptEnvelope = response
            .json()
            .await
            .map_err(|e| PromptError::Transport(e.to_string()))?;

        if !envelope.success {
            tracing::warn!(
                prompt = %name,
                "prompt store rejected request: {}",
                envelope.message.as_deref().unwrap_or("no message")
            );
            return Err(PromptError::NotFound {
                name: name.to_string(),
                label: label.to_string(),
            });
        }

        let template = envelope.prompt.map(|p| p.text).unwrap_or_default();
        compile_template(&template, variables)
    }
}

/// Substitute `{{name}}` placeholders into a prompt template.
///
/// An unresolved placeholder or empty output is a render error.
pub fn compile_template(
    template: &str,
    variables: &PromptVariables,
) -> Result<String, PromptError> {
    let mut text = template.to_string();
    for (name, value) in variables.as_map() {
        text = text.replace(&format!("{{{{{name}}}}}"), value);
    }

    if let Some(start) = text.find("{{") {
        let tail: String = text[start..].chars().take(40).collect();
        return Err(PromptError::Render(format!(
            "unresolved placeholder near '{tail}'"
        )));
    }
    if text.trim().is_empty() {
        return Err(PromptError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> PromptVariables {
        PromptVariables {
            patient_name: "Jordan".to_string(),
            organization_name: "Lakeside Clinic".to_string(),
            template_name: "General Intake".to_string(),
            ai_instructions: "Be brief.".to_string(),
            question_list: "1. Any allergies?".to_string(),
        }
    }

    #[test]
    fn test_compile_substitutes_all_variables() {
        let template = "Call {{patient_name}} for {{organization_name}} using \
                        {{template_name}}. {{ai_instructions}}\n{{question_list}}";
        let compiled = compile_template(template, &variables()).unwrap();

        assert!(compiled.contains("Call Jordan for Lakeside Clinic"));
        assert!(compiled.contains("1. Any allergies?"));
        assert!(!compiled.contains("{{"));
    }

    #[test]
    fn test_compile_fails_on_unresolved_placeholder() {
        let err = compile_template("Hello {{unknown_var}}", &variables()).unwrap_err();
        assert!(matches!(err, PromptError::Render(_)));
    }

    #[test]
    fn test_compile_fails_on_empty_output() {
        let err = compile_template("   ", &variables()).unwrap_err();
        assert!(matches!(err, PromptError::Empty));
    }

    #[test]
    fn test_prompt_envelope_parses() {
        let body = serde_json::json!({
            "success": true,
            "prompt": { "text": "Hello {{patient_name}}" }
        });
        let envelope: PromptEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.prompt.unwrap().text, "Hello {{patient_name}}");
    }
}
