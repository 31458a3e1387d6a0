pub mod embeddings;

pub use embeddings::{clean_for_embedding, Embedder};
