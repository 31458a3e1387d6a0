use axum::extract::State;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "ok",
        passages: state.corpus.passage_count() as usize,
        vector_entries: state.corpus.vector_entries(),
    })
}
