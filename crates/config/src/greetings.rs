//! Greeting templates
//!
//! A small fixed set of opening lines, chosen at random per call and
//! parameterized with the agent, patient, and organization names.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const FALLBACK_TEMPLATE: &str =
    "Hello {patient_name}, this is {agent_name} calling from {organization_name}.";

/// Fixed greeting template set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingTemplates {
    templates: Vec<String>,
}

impl Default for GreetingTemplates {
    fn default() -> Self {
        Self {
            templates: vec![
                "Hello {patient_name}, this is {agent_name} calling from {organization_name}. \
                 I'm calling to collect some information before your upcoming appointment. \
                 Do you have a few minutes to go through some questions with me?"
                    .to_string(),
                "Hi {patient_name}, my name is {agent_name} and I'm calling on behalf of \
                 {organization_name} to go over a few intake questions ahead of your \
                 appointment. Is now a good time?"
                    .to_string(),
                "Good day {patient_name}, this is {agent_name} with {organization_name}. \
                 We'd like to gather a few details before your appointment. Do you have a \
                 moment?"
                    .to_string(),
            ],
        }
    }
}

impl GreetingTemplates {
    /// Build from a custom template list; an empty list falls back to the
    /// built-in set.
    pub fn from_templates(templates: Vec<String>) -> Self {
        if templates.is_empty() {
            Self::default()
        } else {
            Self { templates }
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Pick one template at random and fill in the names.
    pub fn choose(&self, agent_name: &str, patient_name: &str, organization_name: &str) -> String {
        let template = self
            .templates
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_TEMPLATE);
        render(template, agent_name, patient_name, organization_name)
    }
}

fn render(template: &str, agent_name: &str, patient_name: &str, organization_name: &str) -> String {
    template
        .replace("{agent_name}", agent_name)
        .replace("{patient_name}", patient_name)
        .replace("{organization_name}", organization_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chosen_greeting_is_rendered() {
        let templates = GreetingTemplates::default();
        let greeting = templates.choose("Alex", "Jordan", "Lakeside Clinic");

        assert!(greeting.contains("Jordan"));
        assert!(greeting.contains("Alex"));
        assert!(greeting.contains("Lakeside Clinic"));
        assert!(!greeting.contains("{patient_name}"));
        assert!(!greeting.contains("{agent_name}"));
        assert!(!greeting.contains("{organization_name}"));
    }

    #[test]
    fn test_empty_template_list_falls_back() {
        let templates = GreetingTemplates::from_templates(Vec::new());
        assert_eq!(templates.len(), GreetingTemplates::default().len());
    }

    #[test]
    fn test_custom_templates_are_used() {
        let templates =
            GreetingTemplates::from_templates(vec!["Hi {patient_name}!".to_string()]);
        assert_eq!(templates.choose("Alex", "Jordan", "Clinic"), "Hi Jordan!");
    }
}
