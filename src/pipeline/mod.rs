//! Answer pipeline
//!
//! `query -> retrieve top-k -> assemble grounded prompt -> generate -> cite`.
//! Each call is independent: the pipeline holds only read-only handles, so a
//! single instance can serve concurrent chat sessions behind an `Arc`. The
//! first failing stage ends the call; no partial answer is produced.


use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_TOP_K};
use crate::generation::{ChatClient, Generator};
use crate::prompt::PromptTemplate;
use crate::retrieval::{DocumentChunk, Retriever, VectorRetriever};
use crate::{AssistantError, citation};

/// Progress of a single answer request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Retrieving,
    Generating,
    Aggregating,
    Done,
}

/// Generated answer together with the chunks it was grounded on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub chunks: Vec<DocumentChunk>,
}

impl Answer {
    #[inline]
    pub fn page_labels(&self) -> Vec<&str> {
        citation::page_labels(&self.chunks)
    }

    #[inline]
    pub fn citation(&self) -> String {
        citation::citation_footer(&self.chunks)
    }

    /// Text shown to the citizen: the answer, a blank line, then the citation line
    #[inline]
    pub fn render(&self) -> String {
        citation::compose(&self.text, &self.chunks)
    }
}

pub struct AnswerPipeline<R, G> {
    retriever: R,
    generator: G,
    template: PromptTemplate,
    top_k: usize,
}

impl<R: Retriever, G: Generator> AnswerPipeline<R, G> {
    #[inline]
    pub fn new(retriever: R, generator: G) -> Self {
        Self {
            retriever,
            generator,
            template: PromptTemplate::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Answer a citizen question grounded on the plan
    #[inline]
    pub async fn answer(&self, query: &str) -> crate::Result<Answer> {
        let mut stage = Stage::Idle;
        debug!("Answer pipeline: {:?}", stage);

        if query.trim().is_empty() {
            return Err(AssistantError::InvalidQuery(
                "query cannot be empty".to_string(),
            ));
        }

        stage = advance(stage, Stage::Retrieving);
        let mut chunks = self.retriever.retrieve(query, self.top_k).await?;
        if chunks.len() > self.top_k {
            warn!(
                "Retriever returned {} chunks for k={}, keeping the first {}",
                chunks.len(),
                self.top_k,
                self.top_k
            );
            chunks.truncate(self.top_k);
        }
        if chunks.is_empty() {
            warn!("No chunks retrieved, generating with empty context");
        }

        stage = advance(stage, Stage::Generating);
        let prompt = self.template.assemble(&chunks, query);
        let text = self.generator.generate(&prompt).await?;

        stage = advance(stage, Stage::Aggregating);
        let answer = Answer { text, chunks };

        advance(stage, Stage::Done);
        info!(
            "Answered query with {} chunks (pages: {:?})",
            answer.chunks.len(),
            answer.page_labels()
        );

        Ok(answer)
    }
}

impl AnswerPipeline<VectorRetriever, ChatClient> {
    /// Build the production pipeline from validated configuration.
    ///
    /// Credentials, service URLs and the index are all checked here, so a
    /// misconfigured process fails at startup instead of on the first question.
    #[inline]
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        config.validate()?;
        config.require_credentials()?;

        let generator = ChatClient::new(&config.generation)?;
        let retriever = VectorRetriever::from_config(config).await?;

        info!(
            "Answer pipeline ready (embedding {}, generation {}, k={})",
            retriever.embedder().model(),
            generator.model(),
            config.retrieval.k
        );

        Ok(Self::new(retriever, generator)
            .with_template(config.prompt.template()?)
            .with_top_k(config.retrieval.k))
    }
}

fn advance(from: Stage, to: Stage) -> Stage {
    debug!("Answer pipeline: {:?} -> {:?}", from, to);
    to
}
