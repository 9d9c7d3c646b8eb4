//! Local LLM client for an Ollama-style chat endpoint.

use crate::{CompletionSettings, LanguageModel, ModelError};
use async_trait::async_trait;
use tc_core::prompt::{Prompt, Role};
use tokio_util::sync::CancellationToken;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".into(),
            timeout_secs: 120,
        }
    }
}

pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn dispatch(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
    ) -> Result<String, ModelError> {
        let url = format!("{}/api/chat", self.config.endpoint.trim_end_matches('/'));

        let messages: Vec<serde_json::Value> = prompt
            .sections()
            .iter()
            .map(|s| {
                let role = match s.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                serde_json::json!({ "role": role, "content": s.content })
            })
            .collect();

        let body = serde_json::json!({
            "model": settings.model,
            "messages": messages,
            "stream": false,
            "options": {
                "num_predict": settings.max_tokens,
                "temperature": settings.temperature,
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        result["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ModelError::Malformed("missing message.content".into()))
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ModelError::Cancelled),
            result = self.dispatch(prompt, settings) => result,
        }
    }
}
