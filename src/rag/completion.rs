//! Text completion backends.

use crate::config::CompletionSettings;
use crate::error::{EtoError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateCompletionRequestArgs, Prompt};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Trait for models that continue a text prompt.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI completions endpoint.
pub struct OpenAICompleter {
    client: Client<OpenAIConfig>,
    settings: CompletionSettings,
}

impl OpenAICompleter {
    pub fn new(client: Client<OpenAIConfig>, settings: CompletionSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip(self, prompt), fields(model = %self.settings.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CreateCompletionRequestArgs::default()
            .model(&self.settings.model)
            .prompt(Prompt::String(prompt.to_string()))
            .temperature(self.settings.temperature)
            .top_p(self.settings.top_p)
            .max_tokens(self.settings.max_tokens)
            .frequency_penalty(self.settings.frequency_penalty)
            .presence_penalty(self.settings.presence_penalty)
            .build()
            .map_err(|e| EtoError::Rag(e.to_string()))?;

        let response = self
            .client
            .completions()
            .create(request)
            .await
            .map_err(|e| EtoError::OpenAI(format!("Failed to generate completion: {}", e)))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| EtoError::Rag("Empty response from completion model".to_string()))?;

        debug!("Completion returned {} characters", text.len());
        Ok(text.trim().to_string())
    }
}
