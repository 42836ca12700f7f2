//! Embedding providers: an offline hashing embedder and an HTTP client for a
//! model-serving endpoint.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use viaprox_core::{EmbeddingProvider, Error, Result};
use viaprox_similarity::{hash_text_to_vector, DEFAULT_HASH_DIM};

/// Deterministic trigram-hash embedder. Needs no network and no model.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_text_to_vector(text, self.dimension))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpEmbeddingConfig {
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub model: Option<String>,
    pub dimension: usize,
    /// Texts embedded concurrently per batch round.
    pub batch_concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for HttpEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/embeddings".to_string(),
            api_token: None,
            model: None,
            dimension: 768,
            batch_concurrency: 5,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: EmbeddingInput<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Serialize)]
struct EmbeddingInput<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct WrappedOutput {
    #[serde(alias = "embedding")]
    vectors: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Direct {
        #[serde(alias = "embedding")]
        vectors: Vec<f32>,
    },
    Wrapped {
        output: WrappedOutput,
    },
}

/// Pull the vector out of `{"vectors": [...]}`, `{"embedding": [...]}` or
/// `{"output": {"vectors": [...]}}`.
pub fn parse_embedding_response(body: &[u8]) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse = serde_json::from_slice(body)?;
    Ok(match parsed {
        EmbeddingResponse::Direct { vectors } => vectors,
        EmbeddingResponse::Wrapped { output } => output.vectors,
    })
}

/// Embedding provider backed by a JSON-over-HTTP model endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: HttpEmbeddingConfig,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http embedding client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpEmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        "http-embedding"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest {
            input: EmbeddingInput { text },
            model: self.config.model.as_deref(),
        };
        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::unavailable(self.name(), e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unavailable(self.name(), format!("HTTP {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::unavailable(self.name(), e))?;

        let vector = parse_embedding_response(&bytes)?;
        if vector.len() != self.config.dimension {
            return Err(Error::unavailable(
                self.name(),
                format!(
                    "endpoint returned {} dimensions, expected {}",
                    vector.len(),
                    self.config.dimension
                ),
            ));
        }
        debug!(chars = text.len(), dimension = vector.len(), "embedded text");
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_concurrency.max(1)) {
            let vectors = try_join_all(chunk.iter().map(|t| self.embed(t))).await?;
            out.extend(vectors);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_embedder_dimension_and_batch() {
        let embedder = HashEmbedder::new(32);
        let one = embedder.embed("kr 81 # 55 -30").await.unwrap();
        assert_eq!(one.len(), 32);

        let batch = embedder
            .embed_batch(&["kr 81 # 55 -30".to_string(), "cl 10".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], one);
    }

    #[test]
    fn test_parse_response_shapes() {
        assert_eq!(parse_embedding_response(br#"{"vectors":[0.5,1]}"#).unwrap(), vec![0.5, 1.0]);
        assert_eq!(parse_embedding_response(br#"{"embedding":[2]}"#).unwrap(), vec![2.0]);
        assert_eq!(
            parse_embedding_response(br#"{"output":{"text":"x","vectors":[3]}}"#).unwrap(),
            vec![3.0]
        );
        assert!(parse_embedding_response(br#"{"nothing":true}"#).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let provider = HttpEmbeddingProvider::new(HttpEmbeddingConfig {
            endpoint: "http://127.0.0.1:9/embeddings".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let err = provider.embed("kr 1").await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable { .. }));
        assert!(err.is_recoverable());
    }
}
