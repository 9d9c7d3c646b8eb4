//! OpenAI-compatible chat-completions client.
//!
//! Works against api.openai.com and any endpoint speaking the same protocol
//! (Azure gateways, vLLM, llama.cpp server) via the base-url override.

use crate::{CompletionSettings, LanguageModel, ModelError};
use async_trait::async_trait;
use tc_core::prompt::{Prompt, Role};
use tokio_util::sync::CancellationToken;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 60,
        }
    }
}

pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ModelError> {
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
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let messages: Vec<serde_json::Value> = prompt
            .sections()
            .iter()
            .map(|s| serde_json::json!({ "role": role_name(s.role), "content": s.content }))
            .collect();

        let body = serde_json::json!({
            "model": settings.model,
            "messages": messages,
            "max_tokens": settings.max_tokens,
            "temperature": settings.temperature,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ModelError::Malformed("missing choices[0].message.content".into()))?;

        tracing::debug!(
            "completion received: {}",
            content.chars().take(500).collect::<String>()
        );
        Ok(content.to_string())
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
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

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_match_wire_protocol() {
        assert_eq!(role_name(Role::System), "system");
        assert_eq!(role_name(Role::User), "user");
        assert_eq!(role_name(Role::Assistant), "assistant");
    }

    #[tokio::test]
    async fn cancelled_before_dispatch() {
        let client = OpenAiClient::new(OpenAiConfig::new("test-key")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut prompt = Prompt::new();
        prompt.push(tc_core::prompt::PromptSection::user("hello"));

        let err = client
            .complete(&prompt, &CompletionSettings::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Cancelled));
    }
}
