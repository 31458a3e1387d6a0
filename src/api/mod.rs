pub mod health;
pub mod passages;
pub mod queries;
pub mod search;

use axum::http::StatusCode;

use crate::error::RetrievalError;

/// Map a retrieval failure onto the HTTP status a client should see.
pub fn error_response(err: RetrievalError) -> (StatusCode, String) {
    let status = match &err {
        RetrievalError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
        RetrievalError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RetrievalError::Embedding(_) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        tracing::error!("Retrieval failed: {err}");
    }
    (status, err.to_string())
}
