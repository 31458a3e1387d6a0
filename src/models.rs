use serde::{Deserialize, Serialize};

use crate::query_log::QueryLogEntry;

/// A retrievable chunk of a source document. Owned by the corpus index and
/// never modified by the retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub title: String,
    pub page: Option<u32>,
    pub section: Option<String>,
}

/// Which searcher produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Vector,
    Lexical,
}

/// A passage plus the score assigned by the searcher that found it.
///
/// `score` is source dependent: a bounded `(0, 1]` similarity for vector hits,
/// an unbounded BM25 score for lexical hits. `rrf` is only filled in by fusion.
/// `lexical_match` is set when the lexical searcher returned the passage, even
/// if the copy kept by fusion came from the vector searcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub passage: Passage,
    pub score: f32,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrf: Option<f32>,
    #[serde(default)]
    pub lexical_match: bool,
}

impl ScoredCandidate {
    pub fn vector(passage: Passage, distance: f32) -> Self {
        Self {
            passage,
            score: 1.0 / (1.0 + distance),
            source: Source::Vector,
            distance: Some(distance),
            rrf: None,
            lexical_match: false,
        }
    }

    pub fn lexical(passage: Passage, score: f32) -> Self {
        Self {
            passage,
            score,
            source: Source::Lexical,
            distance: None,
            rrf: None,
            lexical_match: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.passage.id
    }

    pub fn text(&self) -> &str {
        &self.passage.text
    }
}

/// Wall-clock duration of each pipeline stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_ms: Option<f64>,
    pub vector_ms: f64,
    pub lexical_ms: f64,
    pub fuse_ms: f64,
    pub dedupe_ms: f64,
    pub threshold_ms: f64,
    pub mmr_ms: f64,
    pub total_retrieve_ms: f64,
}

/// Candidate counts after each stage of one retrieval call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub vector: usize,
    pub lexical: usize,
    pub fused: usize,
    pub deduped: usize,
    pub after_threshold: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
    /// Set when the threshold removed everything and the unfiltered head was used.
    pub threshold_fallback: bool,
    pub timings: StageTimings,
}

/// Search request. Everything except `query` falls back to the configured defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Precomputed query embedding; derived from `query` when absent.
    pub embedding: Option<Vec<f32>>,
    pub top_k: Option<usize>,
    pub hybrid: Option<bool>,
    pub rrf_k: Option<usize>,
    pub mmr_lambda: Option<f32>,
    pub final_k: Option<usize>,
    pub threshold: Option<f32>,
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScoredCandidate>,
    pub stats: RetrievalStats,
}

/// Query parameters for the debug search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugSearchParams {
    pub q: String,
    #[serde(default = "default_debug_top_k")]
    pub top_k: usize,
}

fn default_debug_top_k() -> usize {
    5
}

/// Query parameters for the recent-queries endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentQueriesParams {
    #[serde(default = "default_recent_limit")]
    pub limit: usize,
}

fn default_recent_limit() -> usize {
    20
}

/// Recent-queries response, newest first
#[derive(Debug, Clone, Serialize)]
pub struct RecentQueriesResponse {
    pub items: Vec<QueryLogEntry>,
}

/// A passage submitted for indexing.
#[derive(Debug, Clone, Deserialize)]
pub struct PassageInput {
    pub id: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
    pub text: String,
    pub page: Option<u32>,
    pub section: Option<String>,
    /// Precomputed embedding; computed by the embedding provider when absent.
    pub embedding: Option<Vec<f32>>,
}

fn default_title() -> String {
    "Untitled".to_string()
}

/// Index-passages request
#[derive(Debug, Clone, Deserialize)]
pub struct IndexPassagesRequest {
    pub passages: Vec<PassageInput>,
}

/// Index-passages response
#[derive(Debug, Clone, Serialize)]
pub struct IndexPassagesResponse {
    pub indexed: usize,
    pub ids: Vec<String>,
}

/// Health response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub passages: usize,
    pub vector_entries: usize,
}
