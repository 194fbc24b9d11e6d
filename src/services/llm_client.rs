use crate::{
    config::Config,
    constants::PROBE_MESSAGE,
    error::{AppError, Result},
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Single request/response contract against the hosted language model.
/// No streaming; every failure is a plain `AppError::ModelUnavailable`
/// so callers can pattern-match into fallback mode.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Cheap liveness probe used by start() and the health-check timer.
    async fn probe(&self) -> Result<String>;

    /// Submit one prompt, return the model text verbatim.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client. A missing API key is not a
/// construction error; calls fail with ModelUnavailable and the supervisor
/// keeps the process in fallback mode.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.llm_api_key.clone(),
            api_base: config.llm_api_base.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
        })
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ModelUnavailable("LLM_API_KEY is not set".to_string()))?;
        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("LLM transport failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ModelUnavailable(format!(
                "LLM returned {}: {}",
                status, detail
            )));
        }

        let payload: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("LLM decode failed: {}", e)))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AppError::ModelUnavailable("LLM returned no content".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn probe(&self) -> Result<String> {
        self.chat_completion(PROBE_MESSAGE).await
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat_completion(prompt).await
    }
}
