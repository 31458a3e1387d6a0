use thiserror::Error;

/// Failures surfaced by the retrieval core.
///
/// An empty result is never an error: every stage may legitimately produce
/// an empty list and it propagates as `Ok(vec![])`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrievalError {
    /// The backing vector store or full-text index could not be reached.
    #[error("search index unavailable: {0}")]
    IndexUnavailable(String),

    /// Rejected before any search runs.
    #[error("invalid retrieval parameters: {0}")]
    InvalidParameters(String),

    /// The embedding provider failed to produce a query vector.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl RetrievalError {
    pub fn index_unavailable(err: impl std::fmt::Display) -> Self {
        Self::IndexUnavailable(format!("{err:#}"))
    }
}
