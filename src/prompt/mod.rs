//! Prompt assembler
//!
//! Builds the two-message chat prompt handed to the generator: a system
//! message carrying the instructions with the retrieved passages substituted
//! into the `{context}` slot, and a user message carrying the raw question.


use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::retrieval::DocumentChunk;

pub const CONTEXT_SLOT: &str = "{context}";

/// Separator placed between chunk texts inside the context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub const DEFAULT_SYSTEM_TEMPLATE: &str = "Eres un asistente experto en políticas públicas encargado de responder preguntas de los ciudadanos \
con respecto al plan de desarrollo de Colombia.
A partir de la siguiente información extraída del plan de desarrollo:

{context}

Responde de manera clara y detallada, utilizando un lenguaje accesible para el público en general, las preguntas de un ciudadano.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Grounded prompt: always exactly one system message followed by one user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Prompt {
    messages: [ChatMessage; 2],
}

impl Prompt {
    #[inline]
    pub fn new(system: String, user: String) -> Self {
        Self {
            messages: [
                ChatMessage {
                    role: Role::System,
                    content: system,
                },
                ChatMessage {
                    role: Role::User,
                    content: user,
                },
            ],
        }
    }

    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[inline]
    pub fn system(&self) -> &str {
        &self.messages[0].content
    }

    #[inline]
    pub fn user(&self) -> &str {
        &self.messages[1].content
    }
}

/// System instruction with a single `{context}` slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    #[inline]
    pub fn new(template: &str) -> Result<Self, ConfigError> {
        match template.matches(CONTEXT_SLOT).count() {
            1 => Ok(Self {
                template: template.to_string(),
            }),
            0 => Err(ConfigError::InvalidTemplate(format!(
                "missing {} slot",
                CONTEXT_SLOT
            ))),
            n => Err(ConfigError::InvalidTemplate(format!(
                "{} appears {} times, expected once",
                CONTEXT_SLOT, n
            ))),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute `context` into the slot
    #[inline]
    pub fn render(&self, context: &str) -> String {
        self.template.replacen(CONTEXT_SLOT, context, 1)
    }

    /// Build the prompt for `query` grounded on `chunks`, kept in retrieval order
    #[inline]
    pub fn assemble(&self, chunks: &[DocumentChunk], query: &str) -> Prompt {
        Prompt::new(self.render(&join_context(chunks)), query.to_string())
    }
}

/// Concatenate chunk texts in the order given, without trimming or truncation
#[inline]
pub fn join_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .join(CONTEXT_SEPARATOR)
}
