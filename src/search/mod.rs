pub mod corpus;
pub mod dedupe;
pub mod fusion;
pub mod lexical;
pub mod mmr;
pub mod pipeline;
pub mod threshold;
pub mod vector;

pub use pipeline::{LexicalSearcher, RetrievalParams, Retriever, VectorSearcher};
