use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::agents::prompts::{library, PromptTemplate};
use crate::domain::ports::{Intent, Reasoner, ReasoningError, SubtaskSpec};

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "anthropic/claude-3.5-sonnet";
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Decomposition {
    #[serde(default)]
    subtasks: Vec<SubtaskSpec>,
}

/// Reasoner backed by an OpenAI-compatible chat completions API
///
/// The model is only asked for JSON; anything else is an engine failure.
/// Every completion is bounded by `timeout`, connect and body read included.
pub struct LlmReasoner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl LlmReasoner {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: 0.0,
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt, query), fields(model = %self.model, prompt = %prompt.name))]
    async fn complete(&self, prompt: &PromptTemplate, query: &str) -> Result<String, ReasoningError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.render_query(query) },
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.engine_error("request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Engine(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.engine_error("unreadable response", e))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ReasoningError::Engine("empty completion".to_string()))?;
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    fn engine_error(&self, context: &str, err: reqwest::Error) -> ReasoningError {
        if err.is_timeout() {
            ReasoningError::Engine(format!("no completion within {:?}", self.timeout))
        } else {
            ReasoningError::Engine(format!("{}: {}", context, err))
        }
    }
}

/// Removes a surrounding markdown code fence, if any
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn decompose(&self, query: &str) -> Result<Vec<SubtaskSpec>, ReasoningError> {
        let raw = self.complete(&library::task_decomposition(), query).await?;
        let decomposition: Decomposition = serde_json::from_str(strip_fences(&raw))
            .map_err(|e| ReasoningError::Engine(format!("model returned invalid JSON: {}", e)))?;
        Ok(decomposition.subtasks)
    }

    async fn interpret(&self, text: &str) -> Result<Intent, ReasoningError> {
        let raw = self.complete(&library::request_interpretation(), text).await?;
        let intent: Intent = serde_json::from_str(strip_fences(&raw))
            .map_err(|_| ReasoningError::NotActionable(format!("no lookup found in '{}'", text)))?;
        if intent.targets.is_empty() {
            return Err(ReasoningError::NotActionable(format!(
                "no location found in '{}'",
                text
            )));
        }
        Ok(intent)
    }
}
