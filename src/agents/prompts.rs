// Prompt templates for LLM-backed reasoning
//
// Prompts are versioned for reproducibility. Variables use `{{name}}`
// placeholders; unknown placeholders are left in place.

use std::collections::HashMap;

/// Prompt template structure
pub struct PromptTemplate {
    pub name: String,
    pub version: String,
    pub system: String,
    pub user_template: String,
}

impl PromptTemplate {
    /// Render the user template with variables
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        variables
            .iter()
            .fold(self.user_template.clone(), |text, (key, value)| {
                text.replace(&format!("{{{{{}}}}}", key), value)
            })
    }

    /// Render with a single `{{query}}` variable
    pub fn render_query(&self, query: &str) -> String {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        self.render(&variables)
    }
}

pub mod library {
    use super::PromptTemplate;

    pub fn task_decomposition() -> PromptTemplate {
        PromptTemplate {
            name: "task_decomposition".to_string(),
            version: "1.0.0".to_string(),
            system: "You coordinate weather agents. Split the user's request into \
                     independent subtasks, one per location and lookup. \
                     Respond with JSON only."
                .to_string(),
            user_template: "Request: {{query}}\n\n\
                            Return {\"subtasks\": [{\"action\": \"alerts\" | \"forecast\", \
                            \"location\": \"<US state name, state code, or lat,lon>\"}]}.\n\
                            Keep the order in which locations are mentioned. \
                            Return {\"subtasks\": []} if nothing weather-related is asked."
                .to_string(),
        }
    }

    pub fn request_interpretation() -> PromptTemplate {
        PromptTemplate {
            name: "request_interpretation".to_string(),
            version: "1.0.0".to_string(),
            system: "You are a specialized weather agent executing delegated tasks. \
                     Extract the lookup to perform. Respond with JSON only."
                .to_string(),
            user_template: "Delegated request: {{query}}\n\n\
                            Return {\"action\": \"alerts\" | \"forecast\", \
                            \"targets\": [\"<US state name, state code, or lat,lon>\"]}."
                .to_string(),
        }
    }
}
