//! tc-model: Text-generation backends behind one async trait.

pub mod local;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tc_core::prompt::Prompt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("http error: {0}")]
    Http(String),
    #[error("provider error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("malformed completion payload: {0}")]
    Malformed(String),
    #[error("cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Completion settings
// ---------------------------------------------------------------------------

/// Sampling settings for one completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

// ---------------------------------------------------------------------------
// LanguageModel trait
// ---------------------------------------------------------------------------

/// A text-generation backend.
///
/// `complete` is the sole suspension point of a translation attempt.
/// Implementations observe the cancellation token and surface
/// `ModelError::Cancelled` promptly rather than finishing the request.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError>;
}

#[async_trait]
impl LanguageModel for Arc<dyn LanguageModel> {
    async fn complete(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        (**self).complete(prompt, settings, cancel).await
    }
}

// ---------------------------------------------------------------------------
// Environment-based selection
// ---------------------------------------------------------------------------

/// Pick a client from environment variables.
///
/// `OPENAI_API_KEY` selects the OpenAI-compatible client (honoring
/// `OPENAI_BASE_URL`), `LOCAL_LLM_ENDPOINT` a local Ollama server. With
/// neither set, falls back to Ollama on localhost.
pub fn from_env() -> Result<Box<dyn LanguageModel>, ModelError> {
    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        let mut config = openai::OpenAiConfig::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        return Ok(Box::new(openai::OpenAiClient::new(config)?));
    }

    let endpoint = std::env::var("LOCAL_LLM_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:11434".into());
    Ok(Box::new(local::OllamaClient::new(local::OllamaConfig {
        endpoint,
        ..Default::default()
    })?))
}
