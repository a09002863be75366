// Vector index module
// Read access to the LanceDB table holding the embedded plan chunks


pub mod vector_store;

pub use vector_store::{SearchHit, VectorStore};

use serde::{Deserialize, Serialize};

use crate::retrieval::DocumentChunk;

/// A chunk as persisted in the index, together with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this row
    pub id: String,
    /// Embedding produced by the same model configured for queries
    pub vector: Vec<f32>,
    pub chunk: DocumentChunk,
}
