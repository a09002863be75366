//! Retriever adapter
//!
//! Maps a citizen question to the plan passages most similar to it. The
//! [`Retriever`] trait is the seam the answer pipeline depends on;
//! [`VectorRetriever`] is the production implementation that embeds the query
//! and searches the persisted LanceDB index.


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AssistantError;
use crate::config::Config;
use crate::embeddings::EmbeddingClient;
use crate::index::VectorStore;

/// Metadata stored with every chunk by the ingestion pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Printed page label of the source page, used for citations
    #[serde(default)]
    pub page_label: Option<String>,
    /// File the chunk was extracted from
    #[serde(default)]
    pub source: Option<String>,
    /// Zero-based page index within the source file
    #[serde(default)]
    pub page: Option<u32>,
}

/// A passage of the plan returned by retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    #[inline]
    pub fn new(text: impl Into<String>, page_label: Option<&str>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                page_label: page_label.map(str::to_string),
                ..ChunkMetadata::default()
            },
        }
    }

    /// Page label for citations, empty when the chunk has none
    #[inline]
    pub fn page_label(&self) -> &str {
        self.metadata.page_label.as_deref().unwrap_or_default()
    }
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `k` chunks ordered by descending similarity to `query`
    async fn retrieve(&self, query: &str, k: usize) -> crate::Result<Vec<DocumentChunk>>;
}

/// Retriever backed by an embedding service and the LanceDB index
pub struct VectorRetriever {
    embedder: EmbeddingClient,
    store: VectorStore,
}

impl VectorRetriever {
    #[inline]
    pub fn new(embedder: EmbeddingClient, store: VectorStore) -> Self {
        Self { embedder, store }
    }

    /// Connect to the configured embedding service and open the configured index
    #[inline]
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let embedder = EmbeddingClient::new(&config.embedding)?;
        let store = VectorStore::open(&config.index_path(), &config.retrieval.table).await?;
        Ok(Self::new(embedder, store))
    }

    #[inline]
    pub fn embedder(&self) -> &EmbeddingClient {
        &self.embedder
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[inline]
    async fn retrieve(&self, query: &str, k: usize) -> crate::Result<Vec<DocumentChunk>> {
        let embedder = self.embedder.clone();
        let text = query.to_string();

        let query_vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| AssistantError::Retrieval(format!("Embedding task failed: {}", e)))??;

        let hits = self.store.search(&query_vector, k).await?;

        debug!(
            "Retrieved {} chunks (best similarity {:?})",
            hits.len(),
            hits.first().map(|h| h.similarity_score)
        );

        Ok(hits.into_iter().take(k).map(|hit| hit.chunk).collect())
    }
}
