//! Embedding providers.
//!
//! The `EmbeddingClient` trait is the capability boundary the rest of the
//! system sees: a batch of texts in, one vector per text out, with failures
//! classified as transient or terminal by the error type itself.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Capability interface for embedding providers.
///
/// Implementations are expected to be rate-limited and fallible; callers
/// drive them through a scheduler that retries transient failures.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Get the name of this provider, for log messages.
    fn name(&self) -> &str;

    /// Generate embeddings for the given texts, one vector per input, in
    /// input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbeddingClient {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model to request embeddings from.
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Create a new OpenAI client, reading the key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: "text-embedding-3-small".to_string(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Map a non-success response to the error taxonomy.
    ///
    /// HTTP 429 carries both plain rate limiting and quota exhaustion; the
    /// two are told apart by the structured error code in the body, never
    /// by matching message text.
    async fn classify_failure(response: reqwest::Response) -> EmbeddingError {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            let body = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<OpenAiErrorResponse>(&body) {
                if parsed.error.code.as_deref() == Some("insufficient_quota")
                    || parsed.error.kind.as_deref() == Some("insufficient_quota")
                {
                    return EmbeddingError::QuotaExhausted;
                }
            }

            return EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            };
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OpenAiErrorResponse>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);

        if status.is_client_error() {
            EmbeddingError::InvalidRequest(message)
        } else {
            EmbeddingError::ApiRequest(format!("{status}: {message}"))
        }
    }
}

impl Default for OpenAiEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        debug!(
            "requesting {} embeddings with model {}",
            texts.len(),
            self.model
        );

        let body = serde_json::json!({
            "input": texts,
            "model": self.model
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_failure(response).await);
        }

        let result: OpenAiEmbeddingResponse = response.json().await?;

        // The API reports each vector's position explicitly; order by it
        // rather than trusting the array order.
        let mut data = result.data;
        data.sort_by_key(|item| item.index);
        let embeddings: Vec<Embedding> = data.into_iter().map(|item| item.embedding).collect();

        info!("generated {} embeddings", embeddings.len());

        Ok(embeddings)
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI API error format.
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}
