//! Text → dense vector.
//!
//! [`Embedder`] is the seam the repository depends on. [`OpenAIEmbedder`]
//! calls an OpenAI-compatible `POST {base_url}/embeddings` endpoint and
//! returns the first vector of the response.
//!
//! There is no retry and no fallback vector: any transport, auth, quota or
//! model error becomes [`RetrievalError::Embedding`] for that request.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::EmbeddingConfig;
use crate::error::{RetrievalError, UpstreamError};

/// Turns free text into a fixed-length vector.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Embed one text. Empty input is not special-cased.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Embedder backed by the OpenAI embeddings API (or a compatible server).
///
/// Holds one `reqwest::Client`, so the connection pool is reused across
/// requests.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RetrievalError::Embedding(e.into()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        tracing::debug!(model = %self.model, chars = text.len(), "requesting embedding");

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(UpstreamError::Status {
                status: status.as_u16(),
                body: body_text,
            }));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| RetrievalError::Embedding(e.into()))?;

        parse_openai_response(&json)
            .map_err(RetrievalError::Embedding)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RetrievalError::Embedding(UpstreamError::Malformed(
                    "embedding response contained no vectors".to_string(),
                ))
            })
    }
}

/// Extract the `data[].embedding` arrays, in response order.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>, UpstreamError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| UpstreamError::Malformed("missing data array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| UpstreamError::Malformed("missing embedding".to_string()))?;

        let vec = embedding
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| UpstreamError::Malformed("non-numeric embedding value".to_string()))?;

        embeddings.push(vec);
    }

    Ok(embeddings)
}
