use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};

use crate::error::RetrievalError;
use crate::models::{Passage, ScoredCandidate};
use crate::search::pipeline::LexicalSearcher;

/// English analyzer shipped with tantivy: lowercasing plus Porter stemming.
const TEXT_TOKENIZER: &str = "en_stem";

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// BM25 full-text index over passage bodies, built on tantivy.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    // Field handles
    f_id: Field,
    f_title: Field,
    f_text: Field,
    f_page: Field,
    f_section: Field,
}

impl LexicalIndex {
    /// Create or open a lexical index at the given directory.
    pub fn open_or_create(index_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let mut schema_builder = Schema::builder();
        let f_id = schema_builder.add_text_field("id", STRING | STORED);
        let f_title = schema_builder.add_text_field("title", TEXT | STORED);
        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(TEXT_TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();
        let f_text = schema_builder.add_text_field("text", text_options);
        let f_page = schema_builder.add_u64_field("page", NumericOptions::default() | STORED);
        let f_section = schema_builder.add_text_field("section", STRING | STORED);

        let schema = schema_builder.build();

        let index = if index_dir.join("meta.json").exists() {
            Index::open_in_dir(index_dir).context("Failed to open existing tantivy index")?
        } else {
            Index::create_in_dir(index_dir, schema)
                .context("Failed to create tantivy index")?
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .context("Failed to create reader")?;

        let writer: IndexWriter = index
            .writer(WRITER_HEAP_BYTES)
            .context("Failed to create index writer")?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            f_id,
            f_title,
            f_text,
            f_page,
            f_section,
        })
    }

    /// Index passages, replacing any existing document with the same id.
    pub fn upsert(&self, passages: &[Passage]) -> Result<()> {
        let mut writer = self.writer.lock();

        for passage in passages {
            writer.delete_term(Term::from_field_text(self.f_id, &passage.id));

            let mut doc = TantivyDocument::default();
            doc.add_text(self.f_id, &passage.id);
            doc.add_text(self.f_title, &passage.title);
            doc.add_text(self.f_text, &passage.text);
            if let Some(page) = passage.page {
                doc.add_u64(self.f_page, u64::from(page));
            }
            if let Some(section) = &passage.section {
                doc.add_text(self.f_section, section);
            }
            writer.add_document(doc)?;
        }

        writer.commit().context("Failed to commit index")?;
        drop(writer);
        self.reader.reload().context("Failed to reload reader")?;
        Ok(())
    }

    /// Delete a passage by id.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.delete_term(Term::from_field_text(self.f_id, id));
        writer.commit().context("Failed to commit delete")?;
        drop(writer);
        self.reader.reload().context("Failed to reload reader")?;
        Ok(())
    }

    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Return up to `top_k` passages with non-zero BM25 overlap, best first.
    pub fn search(
        &self,
        query_str: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        let query_str = query_str.trim();
        if query_str.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        // Lenient parsing: stray quotes or colons in user input never fail the search
        let query_parser = QueryParser::for_index(&self.index, vec![self.f_text]);
        let (query, errors) = query_parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            tracing::debug!("Lenient parse of {query_str:?} ignored {} errors", errors.len());
        }

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(top_k))
            .map_err(RetrievalError::index_unavailable)?;

        let mut hits = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            if score <= 0.0 {
                continue;
            }

            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(RetrievalError::index_unavailable)?;

            hits.push(ScoredCandidate::lexical(self.to_passage(&doc), score));
        }

        Ok(hits)
    }

    fn to_passage(&self, doc: &TantivyDocument) -> Passage {
        let text_of = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Passage {
            id: text_of(self.f_id).unwrap_or_default(),
            text: text_of(self.f_text).unwrap_or_default(),
            title: text_of(self.f_title).unwrap_or_default(),
            page: doc
                .get_first(self.f_page)
                .and_then(|v| v.as_u64())
                .and_then(|p| u32::try_from(p).ok()),
            section: text_of(self.f_section),
        }
    }
}

impl LexicalSearcher for LexicalIndex {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        LexicalIndex::search(self, query, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn passage(id: &str, text: &str) -> Passage {
        Passage {
            id: id.to_string(),
            text: text.to_string(),
            title: format!("Title {id}"),
            page: Some(1),
            section: Some("intro".to_string()),
        }
    }

    fn sample_index(dir: &Path) -> LexicalIndex {
        let index = LexicalIndex::open_or_create(dir).unwrap();
        index
            .upsert(&[
                passage("p1", "The cat sat on the mat"),
                passage("p2", "Dogs are running in the park"),
                passage("p3", "A dog runs after a cat"),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_search_returns_only_matching_passages() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());

        let hits = index.search("cat", 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id()).collect();
        assert_eq!(hits.len(), 2);
        assert!(ids.contains(&"p1"));
        assert!(ids.contains(&"p3"));
        assert!(hits.iter().all(|h| h.source == Source::Lexical));
        assert!(hits.iter().all(|h| h.distance.is_none() && h.score > 0.0));
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_stemming_matches_inflections() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());

        // "running" and "runs" both stem to "run"
        let hits = index.search("run", 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id()).collect();
        assert!(ids.contains(&"p2"));
        assert!(ids.contains(&"p3"));
    }

    #[test]
    fn test_empty_query_and_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());

        assert!(index.search("", 10).unwrap().is_empty());
        assert!(index.search("   ", 10).unwrap().is_empty());
        assert!(index.search("zebra", 10).unwrap().is_empty());
    }

    #[test]
    fn test_punctuation_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());

        assert!(index.search("cat: \"mat", 10).is_ok());
        assert!(index.search("((", 10).is_ok());
    }

    #[test]
    fn test_top_k_limits_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());
        assert_eq!(index.search("cat", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_metadata_round_trips_through_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());

        let hits = index.search("mat", 10).unwrap();
        let p = &hits[0].passage;
        assert_eq!(p.id, "p1");
        assert_eq!(p.title, "Title p1");
        assert_eq!(p.page, Some(1));
        assert_eq!(p.section.as_deref(), Some("intro"));
    }

    #[test]
    fn test_upsert_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());
        assert_eq!(index.doc_count(), 3);

        index.upsert(&[passage("p1", "A bird in the sky")]).unwrap();
        assert_eq!(index.doc_count(), 3);
        assert!(index.search("mat", 10).unwrap().is_empty());

        index.delete("p1").unwrap();
        assert_eq!(index.doc_count(), 2);
        assert!(index.search("bird", 10).unwrap().is_empty());
    }
}
