//! # passage-search
//!
//! Retrieves the passages most relevant to a natural-language query from a
//! corpus of pre-chunked, pre-embedded documents, ready to ground a generated
//! answer with citations.
//!
//! ## Architecture
//!
//! Retrieval is a linear pipeline over two independent searches:
//!
//! ```text
//!                  ┌──────────────────────────┐
//!                  │  Query + query embedding │
//!                  └────────────┬─────────────┘
//!                               │
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//!      ┌─────────────────┐             ┌─────────────────┐
//!      │  Vector search  │             │ Lexical search  │
//!      │  L2, top_k      │             │ BM25, top_k     │
//!      │  1/(1+distance) │             │ (hybrid only)   │
//!      └────────┬────────┘             └────────┬────────┘
//!               └───────────────┬───────────────┘
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │  RRF fusion              │
//!                  │  Σ 1/(k + rank)          │
//!                  └────────────┬─────────────┘
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │  Dedupe (500-char key)   │
//!                  └────────────┬─────────────┘
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │  Similarity threshold    │
//!                  │  lexical bypass, soft    │
//!                  │  fallback to unfiltered  │
//!                  └────────────┬─────────────┘
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │  MMR diversification     │
//!                  │  final_k passages        │
//!                  └──────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration: server, data dir, embedder, retrieval
//! - [`error`] - `RetrievalError` taxonomy
//! - [`models`] - `Passage`, `ScoredCandidate`, `RetrievalStats`, request/response types
//! - [`search::vector`] - In-memory vector store with L2 distance and disk persistence
//! - [`search::lexical`] - BM25 full-text index powered by tantivy
//! - [`search::fusion`] - Reciprocal Rank Fusion
//! - [`search::dedupe`] - Text-prefix deduplication
//! - [`search::threshold`] - Similarity threshold with lexical bypass and fallback
//! - [`search::mmr`] - Maximal Marginal Relevance selection
//! - [`search::pipeline`] - Retrieval orchestrator and searcher traits
//! - [`search::corpus`] - Keeps the vector store and full-text index in step
//! - [`llm::embeddings`] - Query/passage embedding via Ollama or OpenAI-compatible APIs
//! - [`query_log`] - Fire-and-forget JSON-lines query log
//! - [`api`] - Axum HTTP handlers for search, passage indexing, recent queries, and health
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod query_log;
pub mod search;
pub mod state;
