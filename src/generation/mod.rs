//! Generator adapter
//!
//! Submits the grounded prompt to a chat-completion service and returns the
//! raw answer text. Any failure is reported as a generation error; nothing is
//! retried here.


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::AssistantError;
use crate::config::{GenerationConfig, Provider};
use crate::http::{self, ServiceError};
use crate::prompt::{ChatMessage, Prompt};

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the answer text for a grounded prompt
    async fn generate(&self, prompt: &Prompt) -> crate::Result<String>;
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: Url,
    provider: Provider,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

impl ChatClient {
    /// Create a client from configuration, resolving credentials up front
    #[inline]
    pub fn new(config: &GenerationConfig) -> crate::Result<Self> {
        let base_url = config.service_url()?;
        let api_key = config.resolve_api_key()?;

        Ok(Self {
            base_url,
            provider: config.provider,
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            agent: http::build_agent(config.timeout()),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = http::build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Check that the chat service answers with the configured credentials
    #[inline]
    pub fn ping(&self) -> crate::Result<()> {
        let path = match self.provider {
            Provider::OpenAi => "/v1/models",
            Provider::Ollama => "/api/tags",
        };
        let url = http::endpoint(&self.base_url, path).map_err(generation_error)?;

        http::get_text(&self.agent, &url, self.api_key.as_deref()).map_err(generation_error)?;

        info!(
            "Generation service at {} is reachable ({})",
            self.base_url,
            self.provider.as_str()
        );
        Ok(())
    }

    /// Blocking chat completion for `prompt`
    #[inline]
    pub fn complete(&self, prompt: &Prompt) -> crate::Result<String> {
        debug!(
            "Requesting completion from {} (temperature {}, system prompt length {})",
            self.model,
            self.temperature,
            prompt.system().len()
        );

        let content = match self.provider {
            Provider::OpenAi => {
                let url = http::endpoint(&self.base_url, "/v1/chat/completions")
                    .map_err(generation_error)?;
                let request = OpenAiChatRequest {
                    model: &self.model,
                    messages: prompt.messages(),
                    temperature: self.temperature,
                };
                let response: OpenAiChatResponse =
                    http::post_json(&self.agent, &url, self.api_key.as_deref(), &request)
                        .map_err(generation_error)?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
            }
            Provider::Ollama => {
                let url = http::endpoint(&self.base_url, "/api/chat").map_err(generation_error)?;
                let request = OllamaChatRequest {
                    model: &self.model,
                    messages: prompt.messages(),
                    stream: false,
                    options: OllamaOptions {
                        temperature: self.temperature,
                    },
                };
                let response: OllamaChatResponse =
                    http::post_json(&self.agent, &url, self.api_key.as_deref(), &request)
                        .map_err(generation_error)?;
                Some(response.message.content)
            }
        };

        match content {
            Some(text) if !text.trim().is_empty() => {
                debug!("Received answer ({} characters)", text.chars().count());
                Ok(text)
            }
            _ => Err(generation_error(ServiceError::MalformedResponse(
                "response contained no answer text".to_string(),
            ))),
        }
    }
}

#[async_trait]
impl Generator for ChatClient {
    #[inline]
    async fn generate(&self, prompt: &Prompt) -> crate::Result<String> {
        let client = self.clone();
        let prompt = prompt.clone();

        tokio::task::spawn_blocking(move || client.complete(&prompt))
            .await
            .map_err(|e| AssistantError::Generation(format!("Completion task failed: {}", e)))?
    }
}

fn generation_error(error: ServiceError) -> AssistantError {
    AssistantError::Generation(format!("Chat completion failed: {}", error))
}
