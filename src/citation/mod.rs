//! Citation aggregator
//!
//! The footer lists the page label of every chunk handed to the generator, in
//! retrieval order. Repeated labels are kept and chunks without a label
//! contribute an empty entry, so the footer always has one entry per chunk.


use itertools::Itertools;

use crate::retrieval::DocumentChunk;

pub const CITATION_PREFIX: &str = "Tomado de las páginas: ";

/// Page labels of `chunks`, one per chunk
#[inline]
pub fn page_labels(chunks: &[DocumentChunk]) -> Vec<&str> {
    chunks.iter().map(DocumentChunk::page_label).collect()
}

/// Citation line for `chunks`; with no chunks this is the bare prefix, trailing space included
#[inline]
pub fn citation_footer(chunks: &[DocumentChunk]) -> String {
    format!(
        "{}{}",
        CITATION_PREFIX,
        chunks.iter().map(DocumentChunk::page_label).join(" ")
    )
}

/// Answer text followed by a blank line and the citation line
#[inline]
pub fn compose(answer: &str, chunks: &[DocumentChunk]) -> String {
    format!("{}\n\n{}", answer, citation_footer(chunks))
}
