use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Maximum characters kept after cleaning a text for embedding.
const MAX_EMBED_CHARS: usize = 10_000;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "else", "for", "on", "in", "at", "to",
    "from", "by", "of", "with", "is", "are", "was", "were", "be", "been", "it", "this", "that",
    "these", "those", "as", "so", "we", "you", "i",
];

/// Normalize text before embedding: lowercase ASCII alphanumerics only,
/// stopwords and single-character tokens dropped, capped at 10 000 chars.
pub fn clean_for_embedding(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    let mut cleaned = lowered
        .split_whitespace()
        .filter(|w| w.len() > 1 && !STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");

    // Pure ASCII by now, so any byte offset is a char boundary
    cleaned.truncate(MAX_EMBED_CHARS);
    cleaned
}

/// Embedding provider client.
///
/// Built once at startup from [`LlmConfig`] and shared through application
/// state; holds its own HTTP client.
#[derive(Clone)]
pub struct Embedder {
    client: reqwest::Client,
    config: LlmConfig,
}

impl Embedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Embed a search query.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results.into_iter().next().context("No embedding returned")
    }

    /// Embed a batch of passage texts, in order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let cleaned: Vec<String> = texts.iter().map(|t| clean_for_embedding(t)).collect();

        let embeddings = match self.config.provider.as_str() {
            "ollama" => self.embed_ollama(&cleaned).await?,
            "openai" => self.embed_openai(&cleaned).await?,
            other => anyhow::bail!("Unknown LLM provider: {other}"),
        };

        if embeddings.len() != texts.len() {
            anyhow::bail!(
                "Embedding provider returned {} vectors for {} inputs",
                embeddings.len(),
                texts.len()
            );
        }
        if let Some(bad) = embeddings
            .iter()
            .find(|e| e.len() != self.config.embedding_dim)
        {
            anyhow::bail!(
                "Embedding provider returned {} dimensions, expected {}",
                bad.len(),
                self.config.embedding_dim
            );
        }

        Ok(embeddings)
    }

    // ─── Ollama ──────────────────────────────────────────────

    async fn embed_ollama(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.base_url);

        // Ollama supports batch embedding with the /api/embed endpoint
        let batch_size = 32;
        let mut all_embeddings = Vec::new();

        for chunk in texts.chunks(batch_size) {
            let req = OllamaEmbedRequest {
                model: self.config.embedding_model.clone(),
                input: chunk.to_vec(),
                truncate: true,
            };

            let resp = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .context("Failed to call Ollama embed API")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("Ollama embed API returned {status}: {body}");
            }

            let body: OllamaEmbedResponse = resp
                .json()
                .await
                .context("Failed to parse Ollama embed response")?;

            all_embeddings.extend(body.embeddings);
        }

        Ok(all_embeddings)
    }

    // ─── OpenAI-compatible ───────────────────────────────────

    async fn embed_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.config.base_url);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let batch_size = 64;
        let mut all_embeddings = Vec::new();

        for chunk in texts.chunks(batch_size) {
            let req = OpenAiEmbedRequest {
                model: self.config.embedding_model.clone(),
                input: chunk.to_vec(),
            };

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&req)
                .send()
                .await
                .context("Failed to call OpenAI embed API")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("OpenAI embed API returned {status}: {body}");
            }

            let body: OpenAiEmbedResponse = resp
                .json()
                .await
                .context("Failed to parse OpenAI embed response")?;

            // The API may return items out of order; `index` is authoritative
            let mut data = body.data;
            data.sort_by_key(|d| d.index);
            all_embeddings.extend(data.into_iter().map(|d| d.embedding));
        }

        Ok(all_embeddings)
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    /// Ask Ollama to truncate inputs longer than the model context instead of failing.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_lowercases_and_strips_punctuation() {
        assert_eq!(
            clean_for_embedding("What is the Pump's MAX-pressure?"),
            "what pump max pressure"
        );
    }

    #[test]
    fn test_clean_drops_stopwords_and_single_chars() {
        assert_eq!(clean_for_embedding("I want a list of the x y z items"), "want list items");
    }

    #[test]
    fn test_clean_replaces_non_ascii() {
        assert_eq!(clean_for_embedding("café résumé 42"), "caf sum 42");
    }

    #[test]
    fn test_clean_caps_length() {
        let long = "word ".repeat(5_000);
        assert_eq!(clean_for_embedding(&long).len(), MAX_EMBED_CHARS);
    }

    #[test]
    fn test_openai_response_parses_without_index() {
        let body: OpenAiEmbedResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2]}]}"#).unwrap();
        assert_eq!(body.data[0].index, 0);
        assert_eq!(body.data[0].embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_an_error() {
        let config = LlmConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        let embedder = Embedder::new(reqwest::Client::new(), config);
        let err = embedder.embed_query("hello world").await.unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
