use std::sync::Arc;

use crate::config::Config;
use crate::llm::Embedder;
use crate::query_log::QueryLog;
use crate::search::corpus::Corpus;
use crate::search::Retriever;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub corpus: Arc<Corpus>,
    pub retriever: Retriever,
    pub embedder: Embedder,
    pub query_log: QueryLog,
}

impl AppState {
    /// Open the corpus and start background services. Requires a tokio runtime.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        // Ensure data directories exist
        std::fs::create_dir_all(config.index_dir())?;
        std::fs::create_dir_all(config.vector_dir())?;

        let corpus = Corpus::open_or_create(&config)?;
        let retriever = corpus.retriever();

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        let embedder = Embedder::new(http_client, config.llm.clone());

        let query_log = QueryLog::start(config.query_log_path());

        Ok(Self {
            config: Arc::new(config),
            corpus: Arc::new(corpus),
            retriever,
            embedder,
            query_log,
        })
    }
}
