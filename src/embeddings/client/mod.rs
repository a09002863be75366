
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::AssistantError;
use crate::config::{EmbeddingConfig, Provider};
use crate::http::{self, ServiceError};

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    provider: Provider,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    /// Create a client from configuration, resolving credentials up front
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> crate::Result<Self> {
        let base_url = config.service_url()?;
        let api_key = config.resolve_api_key()?;

        Ok(Self {
            base_url,
            provider: config.provider,
            model: config.model.clone(),
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

    /// Check that the embedding service answers with the configured credentials
    #[inline]
    pub fn ping(&self) -> crate::Result<()> {
        let path = match self.provider {
            Provider::OpenAi => "/v1/models",
            Provider::Ollama => "/api/tags",
        };
        let url = http::endpoint(&self.base_url, path).map_err(embedding_error)?;

        http::get_text(&self.agent, &url, self.api_key.as_deref()).map_err(embedding_error)?;

        info!(
            "Embedding service at {} is reachable ({})",
            self.base_url,
            self.provider.as_str()
        );
        Ok(())
    }

    /// Generate the embedding vector for a single text
    #[inline]
    pub fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        debug!(
            "Generating embedding with {} for text (length: {})",
            self.model,
            text.len()
        );

        let request = EmbedRequest {
            model: &self.model,
            input: [text],
        };

        let embedding = match self.provider {
            Provider::OpenAi => {
                let url = http::endpoint(&self.base_url, "/v1/embeddings")
                    .map_err(embedding_error)?;
                let response: OpenAiEmbedResponse =
                    http::post_json(&self.agent, &url, self.api_key.as_deref(), &request)
                        .map_err(embedding_error)?;
                response.data.into_iter().next().map(|d| d.embedding)
            }
            Provider::Ollama => {
                let url = http::endpoint(&self.base_url, "/api/embed").map_err(embedding_error)?;
                let response: OllamaEmbedResponse =
                    http::post_json(&self.agent, &url, self.api_key.as_deref(), &request)
                        .map_err(embedding_error)?;
                response.embeddings.into_iter().next()
            }
        };

        match embedding {
            Some(vector) if !vector.is_empty() => {
                debug!("Generated embedding with {} dimensions", vector.len());
                Ok(vector)
            }
            _ => Err(embedding_error(ServiceError::MalformedResponse(
                "response contained no embedding".to_string(),
            ))),
        }
    }
}

fn embedding_error(error: ServiceError) -> AssistantError {
    AssistantError::Retrieval(format!("Embedding request failed: {}", error))
}
