//! Chat front-end contract
//!
//! A turn-based interface hands each question to [`respond`] together with the
//! conversation so far and shows whatever string comes back. Every question is
//! answered on its own: earlier turns are not sent to the retriever or the
//! generator.


use serde::{Deserialize, Serialize};
use tracing::error;

use crate::generation::Generator;
use crate::pipeline::AnswerPipeline;
use crate::retrieval::Retriever;

/// One exchange already shown to the citizen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    #[inline]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Answer `query` for display. Failures become a localized message; the
/// error detail only goes to the log.
#[inline]
pub async fn respond<R: Retriever, G: Generator>(
    pipeline: &AnswerPipeline<R, G>,
    query: &str,
    _history: &[ChatTurn],
) -> String {
    match pipeline.answer(query).await {
        Ok(answer) => answer.render(),
        Err(e) => {
            error!("Failed to answer query: {}", e);
            e.user_message().to_string()
        }
    }
}
