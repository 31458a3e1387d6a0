use axum::routing::{delete, get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use passage_search::api;
use passage_search::config::Config;
use passage_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "Embedding provider: {} ({}, {} dims)",
        config.llm.provider,
        config.llm.base_url,
        config.llm.embedding_dim
    );
    tracing::info!("Retrieval defaults: {:?}", config.retrieval);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;
    tracing::info!("Corpus holds {} passages", state.corpus.passage_count());

    let app = Router::new()
        .route("/api/search", post(api::search::search))
        .route("/api/debug/search", get(api::search::debug_search))
        .route("/api/passages", post(api::passages::index_passages))
        .route("/api/passages/{id}", delete(api::passages::delete_passage))
        .route("/api/queries/recent", get(api::queries::recent_queries))
        .route("/api/health", get(api::health::health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
