use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::models::{RecentQueriesParams, RecentQueriesResponse};
use crate::query_log::{read_recent, MAX_RECENT};
use crate::state::AppState;

/// GET /api/queries/recent?limit=.. - Newest logged searches, newest first.
pub async fn recent_queries(
    State(state): State<AppState>,
    Query(params): Query<RecentQueriesParams>,
) -> Result<Json<RecentQueriesResponse>, (StatusCode, String)> {
    if !(1..=MAX_RECENT).contains(&params.limit) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("limit must be between 1 and {MAX_RECENT}"),
        ));
    }

    let path = state.query_log.path().to_path_buf();
    let items = tokio::task::spawn_blocking(move || read_recent(&path, params.limit))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Query log task failed: {e}"),
            )
        })?
        .map_err(|e| {
            tracing::error!("Failed to read query log: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read query log: {e:#}"),
            )
        })?;

    Ok(Json(RecentQueriesResponse { items }))
}
