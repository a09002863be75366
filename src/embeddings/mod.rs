// Embeddings module
// Turns query text into vectors comparable with the ones stored in the plan index

pub mod client;

pub use client::EmbeddingClient;
