use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the vector store, full-text index, and query log live
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Embedding provider configuration
    pub llm: LlmConfig,
    /// Default retrieval parameters, overridable per request
    pub retrieval: RetrievalConfig,
    /// Maximum total vector entries in memory (0 = unlimited)
    pub max_vector_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embedding API
    pub base_url: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

/// Retrieval defaults used when a request leaves a parameter unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested from each searcher
    pub top_k: usize,
    /// Passages kept after diversification
    pub final_k: usize,
    /// Minimum vector similarity for vector-only hits
    pub similarity_threshold: f32,
    /// RRF damping constant
    pub rrf_k: usize,
    /// MMR relevance/diversity trade-off
    pub mmr_lambda: f32,
    /// Run lexical search alongside vector search
    pub hybrid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8000".to_string(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            max_vector_entries: 500_000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 50,
            final_k: 10,
            similarity_threshold: 0.30,
            rrf_k: 60,
            mmr_lambda: 0.5,
            hybrid: true,
        }
    }
}

/// Overwrite `target` with the parsed value of `key`, if set and parseable.
fn parse_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        match val.parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!("Ignoring unparseable {key}={val:?}"),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PASSAGE_SEARCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("PASSAGE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        parse_env(
            "PASSAGE_SEARCH_MAX_VECTOR_ENTRIES",
            &mut config.max_vector_entries,
        );

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        parse_env("LLM_EMBEDDING_DIM", &mut config.llm.embedding_dim);

        // Retrieval defaults
        let r = &mut config.retrieval;
        parse_env("RETRIEVAL_TOP_K", &mut r.top_k);
        parse_env("RETRIEVAL_FINAL_K", &mut r.final_k);
        parse_env("RETRIEVAL_SIMILARITY_THRESHOLD", &mut r.similarity_threshold);
        parse_env("RETRIEVAL_RRF_K", &mut r.rrf_k);
        parse_env("RETRIEVAL_MMR_LAMBDA", &mut r.mmr_lambda);
        parse_env("RETRIEVAL_HYBRID", &mut r.hybrid);

        config
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    pub fn vector_dir(&self) -> PathBuf {
        self.data_dir.join("vectors")
    }

    pub fn query_log_path(&self) -> PathBuf {
        self.data_dir.join("queries.jsonl")
    }
}
