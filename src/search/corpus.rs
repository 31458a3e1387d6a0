use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::models::Passage;
use crate::search::lexical::LexicalIndex;
use crate::search::pipeline::{LexicalSearcher, Retriever, VectorSearcher};
use crate::search::vector::VectorStore;

/// The passage corpus: a vector store and a full-text index kept in step.
pub struct Corpus {
    vectors: Arc<VectorStore>,
    lexical: Arc<LexicalIndex>,
    embedding_dim: usize,
}

impl Corpus {
    pub fn open_or_create(config: &Config) -> Result<Self> {
        let vectors = VectorStore::open_or_create_with_limit(
            &config.vector_dir(),
            config.max_vector_entries,
        )?;
        let lexical = LexicalIndex::open_or_create(&config.index_dir())?;

        Ok(Self {
            vectors: Arc::new(vectors),
            lexical: Arc::new(lexical),
            embedding_dim: config.llm.embedding_dim,
        })
    }

    /// Index passages in both stores. Existing ids are replaced.
    ///
    /// If the full-text write fails the vector store is rolled back, so a
    /// failed call leaves neither store changed.
    pub fn add_passages(&self, items: &[(Passage, Vec<f32>)]) -> Result<()> {
        self.add_with(items, |passages| self.lexical.upsert(passages))
    }

    fn add_with(
        &self,
        items: &[(Passage, Vec<f32>)],
        write_lexical: impl FnOnce(&[Passage]) -> Result<()>,
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        if let Some((p, e)) = items.iter().find(|(_, e)| e.len() != self.embedding_dim) {
            anyhow::bail!(
                "Passage {} has a {}-dimensional embedding, expected {}",
                p.id,
                e.len(),
                self.embedding_dim
            );
        }

        let ids: Vec<String> = items.iter().map(|(p, _)| p.id.clone()).collect();
        let previous = self.vectors.snapshot(&ids);
        self.vectors.upsert(items)?;

        let passages: Vec<Passage> = items.iter().map(|(p, _)| p.clone()).collect();
        if let Err(e) = write_lexical(&passages) {
            tracing::warn!("Full-text indexing failed, rolling back {} vectors", ids.len());
            let rollback = self
                .vectors
                .delete_many(&ids)
                .and_then(|_| self.vectors.upsert(&previous));
            if let Err(rb) = rollback {
                tracing::error!("Vector rollback failed: {rb:#}");
            }
            return Err(e.context("Failed to index passages for full-text search"));
        }

        tracing::info!("Indexed {} passages", items.len());
        Ok(())
    }

    /// Remove a passage from both stores. Returns whether it existed.
    pub fn delete_passage(&self, id: &str) -> Result<bool> {
        let existed = self.vectors.delete(id)?;
        self.lexical.delete(id)?;
        Ok(existed)
    }

    pub fn passage_count(&self) -> u64 {
        self.lexical.doc_count()
    }

    pub fn vector_entries(&self) -> usize {
        self.vectors.entry_count()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn vector_searcher(&self) -> Arc<dyn VectorSearcher> {
        self.vectors.clone()
    }

    pub fn lexical_searcher(&self) -> Arc<dyn LexicalSearcher> {
        self.lexical.clone()
    }

    /// A retrieval orchestrator reading from this corpus.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.vector_searcher(), self.lexical_searcher())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::RetrievalParams;

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config {
            data_dir: dir.to_path_buf(),
            ..Default::default()
        };
        config.llm.embedding_dim = 2;
        config
    }

    fn passage(id: &str, text: &str) -> Passage {
        Passage {
            id: id.to_string(),
            text: text.to_string(),
            title: "Manual".to_string(),
            page: Some(7),
            section: None,
        }
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::open_or_create(&config(dir.path())).unwrap();
        let err = corpus.add_passages(&[(passage("a", "text"), vec![1.0, 2.0, 3.0])]);
        assert!(err.is_err());
        assert_eq!(corpus.vector_entries(), 0);
        assert_eq!(corpus.passage_count(), 0);
    }

    #[test]
    fn test_add_and_delete_keep_stores_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::open_or_create(&config(dir.path())).unwrap();
        corpus
            .add_passages(&[
                (passage("a", "pump maintenance schedule"), vec![1.0, 0.0]),
                (passage("b", "valve replacement guide"), vec![0.0, 1.0]),
            ])
            .unwrap();
        assert_eq!(corpus.vector_entries(), 2);
        assert_eq!(corpus.passage_count(), 2);

        assert!(corpus.delete_passage("a").unwrap());
        assert!(!corpus.delete_passage("a").unwrap());
        assert_eq!(corpus.vector_entries(), 1);
        assert_eq!(corpus.passage_count(), 1);
    }

    #[test]
    fn test_failed_lexical_write_rolls_back_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::open_or_create(&config(dir.path())).unwrap();
        corpus
            .add_passages(&[(passage("a", "pump maintenance schedule"), vec![1.0, 0.0])])
            .unwrap();

        let res = corpus.add_with(
            &[
                (passage("a", "rewritten pump text"), vec![0.0, 1.0]),
                (passage("b", "valve replacement guide"), vec![5.0, 5.0]),
            ],
            |_| anyhow::bail!("disk full"),
        );
        assert!(res.is_err());

        assert_eq!(corpus.vector_entries(), 1);
        assert_eq!(corpus.passage_count(), 1);
        let hits = corpus.vector_searcher().search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "a");
        assert_eq!(hits[0].text(), "pump maintenance schedule");
        assert_eq!(hits[0].distance, Some(0.0));
    }

    #[test]
    fn test_searchers_share_the_corpus_stores() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::open_or_create(&config(dir.path())).unwrap();
        corpus
            .add_passages(&[(passage("a", "pump maintenance schedule"), vec![1.0, 0.0])])
            .unwrap();

        let vector_hits = corpus.vector_searcher().search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(vector_hits.len(), 1);
        let lexical_hits = corpus.lexical_searcher().search("maintenance", 5).unwrap();
        assert_eq!(lexical_hits[0].id(), "a");
    }

    #[tokio::test]
    async fn test_retriever_reads_both_stores() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = Corpus::open_or_create(&config(dir.path())).unwrap();
        corpus
            .add_passages(&[
                (passage("a", "pump maintenance schedule"), vec![1.0, 0.0]),
                (passage("b", "valve replacement guide"), vec![0.0, 1.0]),
            ])
            .unwrap();

        let params = RetrievalParams {
            threshold: 0.0,
            ..Default::default()
        };
        let (results, stats) = corpus
            .retriever()
            .retrieve("valve", vec![1.0, 0.0], &params)
            .await
            .unwrap();

        assert_eq!(stats.vector, 2);
        assert_eq!(stats.lexical, 1);
        assert_eq!(stats.fused, 2);
        // b is rank 2 in vector and rank 1 in lexical
        assert_eq!(results[0].id(), "b");
        assert_eq!(results.len(), 2);
    }
}
