//! Typed payloads returned by the record store

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patient record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub full_name: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub date_of_birth: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,
}

/// Organization record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub phone: Option<String>,
}

/// Intake template record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub template_name: String,

    #[serde(default)]
    pub template_type: Option<String>,

    #[serde(default)]
    pub structure: Option<String>,

    #[serde(default)]
    pub instructions_for_ai: String,

    #[serde(default)]
    pub questions: Vec<TemplateQuestion>,
}

/// One scripted question within a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateQuestion {
    pub id: String,
    pub question_text: String,

    #[serde(default = "default_question_type")]
    pub question_type: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub follow_up_questions: Option<Vec<String>>,

    #[serde(default)]
    pub validation_rules: Option<Value>,
}

fn default_question_type() -> String {
    "text".to_string()
}
