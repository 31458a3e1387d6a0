use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::RetrievalError;
use crate::models::{Passage, ScoredCandidate};
use crate::search::pipeline::VectorSearcher;

/// A stored vector entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorEntry {
    passage: Passage,
    embedding: Vec<f32>,
}

/// In-memory vector store with disk persistence and L2 distance search.
pub struct VectorStore {
    entries: RwLock<Vec<VectorEntry>>,
    persist_path: PathBuf,
    max_entries: usize,
}

impl VectorStore {
    pub fn open_or_create(vector_dir: &Path) -> Result<Self> {
        Self::open_or_create_with_limit(vector_dir, 0)
    }

    /// Open the store, capping it at `max_entries` passages (0 = unlimited).
    pub fn open_or_create_with_limit(vector_dir: &Path, max_entries: usize) -> Result<Self> {
        std::fs::create_dir_all(vector_dir)?;
        let persist_path = vector_dir.join("vectors.json");

        let entries = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read vector store")?;
            serde_json::from_str(&data).context("Failed to parse vector store")?
        } else {
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path,
            max_entries,
        })
    }

    /// Insert or replace passages with their embeddings.
    ///
    /// Memory only changes if the new state reaches disk.
    pub fn upsert(&self, items: &[(Passage, Vec<f32>)]) -> Result<()> {
        let mut entries = self.entries.write();
        let original_len = entries.len();

        // Target slot per item; repeated ids in one batch share a slot
        let mut slots = Vec::with_capacity(items.len());
        let mut next_slot = original_len;
        {
            let mut position: HashMap<&str, usize> = entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.passage.id.as_str(), i))
                .collect();
            for (passage, _) in items {
                let slot = *position.entry(passage.id.as_str()).or_insert_with(|| {
                    next_slot += 1;
                    next_slot - 1
                });
                slots.push(slot);
            }
        }

        let new_count = next_slot - original_len;
        if self.max_entries > 0 && original_len + new_count > self.max_entries {
            anyhow::bail!(
                "Vector store limit reached ({} entries, {} new, max {})",
                original_len,
                new_count,
                self.max_entries
            );
        }

        let mut replaced: Vec<(usize, VectorEntry)> = Vec::new();
        for ((passage, embedding), slot) in items.iter().zip(slots) {
            let entry = VectorEntry {
                passage: passage.clone(),
                embedding: embedding.clone(),
            };
            if slot < entries.len() {
                let old = std::mem::replace(&mut entries[slot], entry);
                if slot < original_len {
                    replaced.push((slot, old));
                }
            } else {
                entries.push(entry);
            }
        }

        if let Err(e) = self.persist(entries.as_slice()) {
            entries.truncate(original_len);
            // Reverse order so a slot replaced twice ends on its original entry
            for (slot, old) in replaced.into_iter().rev() {
                entries[slot] = old;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Delete a passage. Returns whether it was present.
    pub fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.delete_many(&[id.to_string()])? > 0)
    }

    /// Delete passages by id. Returns how many were present.
    pub fn delete_many(&self, ids: &[String]) -> Result<usize> {
        let mut entries = self.entries.write();
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let kept: Vec<&VectorEntry> = entries
            .iter()
            .filter(|e| !doomed.contains(e.passage.id.as_str()))
            .collect();
        let removed = entries.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(kept.as_slice())?;
        entries.retain(|e| !doomed.contains(e.passage.id.as_str()));
        Ok(removed)
    }

    /// Current entries for the given ids, for restoring after a failed write.
    pub fn snapshot(&self, ids: &[String]) -> Vec<(Passage, Vec<f32>)> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.entries
            .read()
            .iter()
            .filter(|e| wanted.contains(e.passage.id.as_str()))
            .map(|e| (e.passage.clone(), e.embedding.clone()))
            .collect()
    }

    /// Return the `top_k` nearest passages by Euclidean distance.
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = Vec::with_capacity(entries.len());
        for e in entries.iter() {
            if e.embedding.len() != query_embedding.len() {
                return Err(RetrievalError::InvalidParameters(format!(
                    "query embedding has {} dimensions, index has {}",
                    query_embedding.len(),
                    e.embedding.len()
                )));
            }
            scored.push((l2_distance(query_embedding, &e.embedding), e));
        }

        // Stable sort: equal distances keep insertion order
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(distance, e)| ScoredCandidate::vector(e.passage.clone(), distance))
            .collect())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Atomic write via temp file + rename.
    fn persist<E: Serialize>(&self, entries: &[E]) -> Result<()> {
        let data = serde_json::to_string(entries)?;
        let tmp_path = self.persist_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data).context("Failed to write vector store")?;
        std::fs::rename(&tmp_path, &self.persist_path).context("Failed to replace vector store")?;
        Ok(())
    }
}

impl VectorSearcher for VectorStore {
    fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        VectorStore::search(self, embedding, top_k)
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
