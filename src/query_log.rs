//! Best-effort query log.
//!
//! Requests push entries onto a bounded queue and move on; a background
//! task appends them to a JSON-lines file. When the queue is full the entry is
//! dropped with a warning. Logging failures never reach the request path.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// One logged search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: Uuid,
    pub query: String,
    /// Query text after embedding normalization
    pub cleaned: String,
    pub results: usize,
    pub total_retrieve_ms: f64,
    pub logged_at: DateTime<Utc>,
}

impl QueryLogEntry {
    pub fn new(query: &str, cleaned: String, results: usize, total_retrieve_ms: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            cleaned,
            results,
            total_retrieve_ms,
            logged_at: Utc::now(),
        }
    }
}

/// Entries waiting for the writer before new ones are dropped.
const QUEUE_CAPACITY: usize = 1024;

/// Upper bound for `read_recent`.
pub const MAX_RECENT: usize = 100;

/// Handle to the background query log writer.
#[derive(Clone)]
pub struct QueryLog {
    tx: mpsc::Sender<QueryLogEntry>,
    path: PathBuf,
}

impl QueryLog {
    /// Spawn the writer task appending to `path`. Must be called inside a tokio runtime.
    pub fn start(path: PathBuf) -> Self {
        Self::start_with_capacity(path, QUEUE_CAPACITY)
    }

    fn start_with_capacity(path: PathBuf, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<QueryLogEntry>(capacity);
        let log_path = path.clone();

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let path = path.clone();
                let written =
                    tokio::task::spawn_blocking(move || append_entry(&path, &entry)).await;
                match written {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("Failed to write query log: {e:#}"),
                    Err(e) => tracing::warn!("Query log writer task failed: {e}"),
                }
            }
            tracing::debug!("Query log writer stopped");
        });

        Self { tx, path: log_path }
    }

    /// Queue an entry. Never blocks and never fails the caller.
    pub fn record(&self, entry: QueryLogEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                tracing::warn!("Query log queue full; dropping entry for {:?}", entry.query)
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Query log queue closed; dropping entry")
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Newest `limit` entries of the log at `path`, newest first.
///
/// A missing file is an empty log. Unparseable lines are skipped.
pub fn read_recent(path: &Path, limit: usize) -> Result<Vec<QueryLogEntry>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()))
        }
    };

    Ok(data
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping malformed query log line: {e}");
                None
            }
        })
        .take(limit)
        .collect())
}

fn append_entry(path: &Path, entry: &QueryLogEntry) -> Result<()> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}
