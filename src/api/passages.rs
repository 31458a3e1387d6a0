use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::models::{IndexPassagesRequest, IndexPassagesResponse, Passage};
use crate::state::AppState;

/// Maximum passages accepted per indexing request.
const MAX_PASSAGES_PER_REQUEST: usize = 1_000;

/// POST /api/passages - Index pre-chunked passages.
///
/// Passages without an embedding are embedded in one batch; passages without
/// an id get a fresh UUID.
pub async fn index_passages(
    State(state): State<AppState>,
    Json(req): Json<IndexPassagesRequest>,
) -> Result<(StatusCode, Json<IndexPassagesResponse>), (StatusCode, String)> {
    if req.passages.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No passages given".to_string()));
    }
    if req.passages.len() > MAX_PASSAGES_PER_REQUEST {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("At most {MAX_PASSAGES_PER_REQUEST} passages per request"),
        ));
    }

    let dim = state.corpus.embedding_dim();
    let mut passages = Vec::with_capacity(req.passages.len());
    let mut embeddings = Vec::with_capacity(req.passages.len());

    for input in req.passages {
        if input.text.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "Passage text is required".to_string()));
        }
        if let Some(e) = &input.embedding {
            if e.len() != dim {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("Embedding has {} dimensions, expected {dim}", e.len()),
                ));
            }
        }
        passages.push(Passage {
            id: input
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            text: input.text,
            title: input.title,
            page: input.page,
            section: input.section,
        });
        embeddings.push(input.embedding);
    }

    // Embed whatever arrived without a vector, in one batch
    let missing: Vec<usize> = (0..embeddings.len())
        .filter(|&i| embeddings[i].is_none())
        .collect();
    if !missing.is_empty() {
        let texts: Vec<String> = missing.iter().map(|&i| passages[i].text.clone()).collect();
        let computed = state.embedder.embed_batch(&texts).await.map_err(|e| {
            tracing::warn!("Passage embedding failed: {e:#}");
            (StatusCode::BAD_GATEWAY, format!("Embedding failed: {e:#}"))
        })?;
        for (i, embedding) in missing.into_iter().zip(computed) {
            embeddings[i] = Some(embedding);
        }
    }

    let items: Vec<(Passage, Vec<f32>)> = passages
        .into_iter()
        .zip(embeddings)
        .map(|(p, e)| (p, e.unwrap_or_default()))
        .collect();
    let ids: Vec<String> = items.iter().map(|(p, _)| p.id.clone()).collect();

    let corpus = state.corpus.clone();
    tokio::task::spawn_blocking(move || corpus.add_passages(&items))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Indexing task failed: {e}"),
            )
        })?
        .map_err(|e| {
            tracing::error!("Failed to index passages: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to index passages: {e:#}"),
            )
        })?;

    Ok((
        StatusCode::CREATED,
        Json(IndexPassagesResponse {
            indexed: ids.len(),
            ids,
        }),
    ))
}

/// DELETE /api/passages/{id} - Remove a passage from both indexes
pub async fn delete_passage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let corpus = state.corpus.clone();
    let existed = tokio::task::spawn_blocking(move || corpus.delete_passage(&id))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Delete task failed: {e}"),
            )
        })?
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to delete passage: {e:#}"),
            )
        })?;

    if existed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Passage not found".to_string()))
    }
}
