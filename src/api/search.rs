use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error_response;
use crate::error::RetrievalError;
use crate::llm::clean_for_embedding;
use crate::models::{
    DebugSearchParams, RetrievalStats, ScoredCandidate, SearchRequest, SearchResponse,
};
use crate::query_log::QueryLogEntry;
use crate::search::RetrievalParams;
use crate::state::AppState;

/// POST /api/search - Hybrid retrieval:
///   1. Embed the query (unless an embedding was supplied)
///   2. Vector + lexical search, fused with RRF
///   3. Dedupe, similarity threshold, MMR diversification
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.is_empty() && req.embedding.is_none() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    let defaults = &state.config.retrieval;
    let params = RetrievalParams {
        top_k: req.top_k.unwrap_or(defaults.top_k),
        use_lexical: req.hybrid.unwrap_or(defaults.hybrid),
        rrf_k: req.rrf_k.unwrap_or(defaults.rrf_k),
        mmr_lambda: req.mmr_lambda.unwrap_or(defaults.mmr_lambda),
        final_k: req.final_k.unwrap_or(defaults.final_k),
        threshold: req.threshold.unwrap_or(defaults.similarity_threshold),
    };

    let (results, stats) = run_search(&state, &query, req.embedding, &params).await?;

    Ok(Json(SearchResponse {
        query,
        results,
        stats,
    }))
}

/// GET /api/debug/search?q=..&top_k=.. - Hybrid retrieval with configured defaults.
pub async fn debug_search(
    State(state): State<AppState>,
    Query(params): Query<DebugSearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    let mut retrieval = RetrievalParams::from(&state.config.retrieval);
    retrieval.top_k = params.top_k;
    retrieval.use_lexical = true;
    retrieval.final_k = params.top_k.min(state.config.retrieval.final_k);

    let (results, stats) = run_search(&state, &query, None, &retrieval).await?;

    Ok(Json(SearchResponse {
        query,
        results,
        stats,
    }))
}

/// Validate, embed if needed, retrieve, and queue a query log entry.
pub async fn run_search(
    state: &AppState,
    query: &str,
    embedding: Option<Vec<f32>>,
    params: &RetrievalParams,
) -> Result<(Vec<ScoredCandidate>, RetrievalStats), (StatusCode, String)> {
    // Reject bad parameters before paying for an embedding call
    params.validate().map_err(error_response)?;

    let (embedding, embed_ms) = match embedding {
        Some(e) => (e, None),
        None => {
            let t = Instant::now();
            let e = state
                .embedder
                .embed_query(query)
                .await
                .map_err(|e| error_response(RetrievalError::Embedding(format!("{e:#}"))))?;
            (e, Some(t.elapsed().as_secs_f64() * 1000.0))
        }
    };

    let (results, mut stats) = state
        .retriever
        .retrieve(query, embedding, params)
        .await
        .map_err(error_response)?;
    stats.timings.embed_ms = embed_ms;

    if stats.final_count == 0 {
        tracing::info!("No passages matched {query:?}");
    }

    state.query_log.record(QueryLogEntry::new(
        query,
        clean_for_embedding(query),
        results.len(),
        stats.timings.total_retrieve_ms,
    ));

    Ok((results, stats))
}
