//! Narrow contracts for the hosted capabilities the story engine calls into.
//!
//! The narrator only ever talks to a [`LanguageModel`] and an [`Embedder`].
//! Gemini-backed implementations live here; scripted doubles live in
//! [`crate::testing`].

use async_trait::async_trait;
use gemini::{Content, Gemini, Request};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Whether a failed service call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Transient,
    Permanent,
}

/// Failure reported by a language-model or embedding service.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} service error: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ServiceErrorKind::Transient
    }
}

impl From<gemini::Error> for ServiceError {
    fn from(err: gemini::Error) -> Self {
        if err.is_transient() {
            Self::transient(err.to_string())
        } else {
            Self::permanent(err.to_string())
        }
    }
}

/// Identifies one conversation with the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text generation capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// Implementations must not rely on any state kept for `conversation`
    /// between calls: every prompt carries the full context it needs.
    async fn send(&self, conversation: &ConversationId, prompt: &str)
        -> Result<String, ServiceError>;
}

/// Text embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Fixed output dimension, when known ahead of time.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Generation settings applied to every Gemini request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: Some(0.9),
            max_output_tokens: Some(1024),
        }
    }
}

/// [`LanguageModel`] backed by Gemini `generateContent`.
#[derive(Clone)]
pub struct GeminiModel {
    client: Gemini,
    settings: GenerationSettings,
}

impl GeminiModel {
    pub fn new(client: Gemini) -> Self {
        Self {
            client,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the single-turn request sent for a prompt.
    pub fn request_for(&self, prompt: &str) -> Request {
        let mut request = Request::new(vec![Content::user(prompt)]);
        if let Some(ref model) = self.settings.model {
            request = request.with_model(model);
        }
        if let Some(temp) = self.settings.temperature {
            request = request.with_temperature(temp);
        }
        if let Some(max) = self.settings.max_output_tokens {
            request = request.with_max_output_tokens(max);
        }
        request
    }

    pub fn client(&self) -> &Gemini {
        &self.client
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn send(
        &self,
        conversation: &ConversationId,
        prompt: &str,
    ) -> Result<String, ServiceError> {
        tracing::debug!(%conversation, prompt_chars = prompt.len(), "sending prompt to Gemini");
        let response = self.client.generate(self.request_for(prompt)).await?;
        tracing::debug!(
            %conversation,
            output_tokens = response.usage.output_tokens,
            finish = ?response.finish_reason,
            "Gemini responded"
        );
        Ok(response.text())
    }
}

/// [`Embedder`] backed by Gemini `embedContent` / `batchEmbedContents`.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Gemini,
    dimension: usize,
}

impl GeminiEmbedder {
    pub fn new(client: Gemini) -> Self {
        Self {
            client,
            dimension: gemini::DEFAULT_EMBEDDING_DIMENSION,
        }
    }

    /// Override the expected output dimension (for non-default models).
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(self.client.embed(text).await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(self.client.embed_batch(texts).await?)
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}
