use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::models::{RetrievalStats, ScoredCandidate};
use crate::search::dedupe::dedupe_by_text;
use crate::search::fusion::reciprocal_rank_fusion;
use crate::search::mmr::select_diverse;
use crate::search::threshold::apply_threshold;

/// Nearest-neighbour search over passage embeddings.
pub trait VectorSearcher: Send + Sync {
    fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError>;
}

/// Keyword search over passage text.
pub trait LexicalSearcher: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>, RetrievalError>;
}

/// Knobs for a single retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalParams {
    /// Candidates requested from each searcher
    pub top_k: usize,
    /// Run lexical search and fuse it with vector search
    pub use_lexical: bool,
    pub rrf_k: usize,
    pub mmr_lambda: f32,
    /// Maximum passages returned
    pub final_k: usize,
    /// Minimum similarity for vector hits
    pub threshold: f32,
}

impl From<&RetrievalConfig> for RetrievalParams {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            use_lexical: config.hybrid,
            rrf_k: config.rrf_k,
            mmr_lambda: config.mmr_lambda,
            final_k: config.final_k,
            threshold: config.similarity_threshold,
        }
    }
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl RetrievalParams {
    pub fn validate(&self) -> Result<(), RetrievalError> {
        let invalid = |msg: String| Err(RetrievalError::InvalidParameters(msg));

        if self.top_k == 0 {
            return invalid("top_k must be positive".to_string());
        }
        if self.final_k == 0 {
            return invalid("final_k must be positive".to_string());
        }
        if self.rrf_k == 0 {
            return invalid("rrf_k must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return invalid(format!("mmr_lambda must be in [0, 1], got {}", self.mmr_lambda));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return invalid(format!("threshold must be in [0, 1], got {}", self.threshold));
        }
        Ok(())
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Hybrid retrieval orchestrator.
///
/// ```text
/// VectorSearch ─┐
///               ├─ Fuse (RRF) → Dedupe → Threshold → MMR
/// LexicalSearch ┘
/// ```
///
/// The two searches run concurrently on the blocking pool. Dropping the
/// returned future abandons both and discards their results.
#[derive(Clone)]
pub struct Retriever {
    vector: Arc<dyn VectorSearcher>,
    lexical: Arc<dyn LexicalSearcher>,
}

impl Retriever {
    pub fn new(vector: Arc<dyn VectorSearcher>, lexical: Arc<dyn LexicalSearcher>) -> Self {
        Self { vector, lexical }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        embedding: Vec<f32>,
        params: &RetrievalParams,
    ) -> Result<(Vec<ScoredCandidate>, RetrievalStats), RetrievalError> {
        params.validate()?;
        if embedding.is_empty() {
            return Err(RetrievalError::InvalidParameters(
                "query embedding is empty".to_string(),
            ));
        }

        let started = Instant::now();
        let top_k = params.top_k;

        let vector_task = {
            let searcher = self.vector.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    let t = Instant::now();
                    searcher.search(&embedding, top_k).map(|hits| (hits, elapsed_ms(t)))
                })
                .await
                .map_err(|e| RetrievalError::index_unavailable(format!("vector search task: {e}")))
                .and_then(|res| res)
            }
        };

        let lexical_task = {
            let searcher = self.lexical.clone();
            let query = query.to_string();
            let enabled = params.use_lexical;
            async move {
                if !enabled {
                    return Ok((Vec::new(), 0.0));
                }
                tokio::task::spawn_blocking(move || {
                    let t = Instant::now();
                    searcher.search(&query, top_k).map(|hits| (hits, elapsed_ms(t)))
                })
                .await
                .map_err(|e| RetrievalError::index_unavailable(format!("lexical search task: {e}")))
                .and_then(|res| res)
            }
        };

        let ((vector_hits, vector_ms), (lexical_hits, lexical_ms)) =
            tokio::try_join!(vector_task, lexical_task)?;

        let mut stats = RetrievalStats::default();
        stats.timings.vector_ms = vector_ms;
        stats.timings.lexical_ms = lexical_ms;

        let results = refine(vector_hits, lexical_hits, params, &mut stats);
        stats.timings.total_retrieve_ms = elapsed_ms(started);

        tracing::info!(
            vector = stats.vector,
            lexical = stats.lexical,
            fused = stats.fused,
            after_threshold = stats.after_threshold,
            final_count = stats.final_count,
            total_retrieve_ms = stats.timings.total_retrieve_ms,
            "Retrieval complete"
        );

        Ok((results, stats))
    }
}

/// Pure post-search stages: fuse, dedupe, threshold, diversify.
pub fn refine(
    vector_hits: Vec<ScoredCandidate>,
    lexical_hits: Vec<ScoredCandidate>,
    params: &RetrievalParams,
    stats: &mut RetrievalStats,
) -> Vec<ScoredCandidate> {
    stats.vector = vector_hits.len();
    stats.lexical = lexical_hits.len();

    let t = Instant::now();
    let mut lists = vec![vector_hits];
    if params.use_lexical {
        lists.push(lexical_hits);
    }
    let fused = reciprocal_rank_fusion(lists, params.rrf_k);
    stats.fused = fused.len();
    stats.timings.fuse_ms = elapsed_ms(t);

    let t = Instant::now();
    let deduped = dedupe_by_text(fused);
    stats.deduped = deduped.len();
    stats.timings.dedupe_ms = elapsed_ms(t);

    let t = Instant::now();
    let outcome = apply_threshold(&deduped, params.threshold, params.use_lexical, params.final_k);
    stats.after_threshold = outcome.kept.len();
    stats.threshold_fallback = outcome.fell_back;
    stats.timings.threshold_ms = elapsed_ms(t);

    let t = Instant::now();
    let selected = select_diverse(outcome.kept, params.mmr_lambda, params.final_k);
    stats.final_count = selected.len();
    stats.timings.mmr_ms = elapsed_ms(t);

    tracing::debug!(
        "Fused {} -> deduped {} -> thresholded {} -> selected {}",
        stats.fused,
        stats.deduped,
        stats.after_threshold,
        stats.final_count
    );

    selected
}
