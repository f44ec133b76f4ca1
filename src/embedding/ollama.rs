//! Ollama embedding provider (`POST /api/embed`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{l2_normalize, EmbeddingProvider};
use crate::config::OllamaConfig;

pub struct OllamaEmbedding {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", config.base_url.trim_end_matches('/')),
            model: config.embedding_model.clone(),
            dim: config.embedding_dim,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            input: [text],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("embedding request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("ollama embed returned HTTP {status}: {body}"));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("failed to decode ollama embed response")?;

        let embedding = parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("ollama embed returned no vectors"))?;

        anyhow::ensure!(
            embedding.len() == self.dim,
            "model {} produced {} dimensions, expected {}",
            self.model,
            embedding.len(),
            self.dim
        );

        tracing::debug!(model = %self.model, chars = text.len(), "text embedded");
        Ok(l2_normalize(&embedding))
    }

    fn dimensions(&self) -> usize {
        self.dim
    }
}
