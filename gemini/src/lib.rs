//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the Generative Language API with:
//! - Non-streaming and streaming text generation
//! - Single and batched text embeddings
//! - Buffered SSE parsing for streaming responses

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Output dimension of the default embedding model.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Prompt was blocked: {0}")]
    Blocked(String),

    #[error("Response contained no candidates")]
    EmptyResponse,
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            _ => false,
        }
    }
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Create a Gemini client from the GOOGLE_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default generation model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model for this client.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// The default generation model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The embedding model.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Send a generation request and return the full response.
    pub async fn generate(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);

        tracing::debug!(%model, contents = request.contents.len(), "generateContent");

        let response = self
            .client
            .post(format!("{API_BASE}/models/{model}:generateContent"))
            .headers(self.build_headers()?)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    /// Send a generation request and stream the response.
    pub async fn stream(
        &self,
        request: Request,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);

        let response = self
            .client
            .post(format!(
                "{API_BASE}/models/{model}:streamGenerateContent?alt=sse"
            ))
            .headers(self.build_headers()?)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        // Use scan to maintain a buffer for incomplete SSE events across chunks
        let stream = response
            .bytes_stream()
            .scan(String::new(), |buffer, result| {
                let events = match result {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        parse_sse_events_buffered(buffer)
                    }
                    Err(e) => vec![Err(Error::Network(e.to_string()))],
                };
                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(stream))
    }

    /// Embed a single text with the configured embedding model.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let model = &self.embedding_model;
        let body = ApiEmbedRequest {
            model: format!("models/{model}"),
            content: ApiContent::text(None, text),
        };

        let response = self
            .client
            .post(format!("{API_BASE}/models/{model}:embedContent"))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let parsed: ApiEmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(parsed.embedding.values)
    }

    /// Embed several texts in one call, preserving input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = &self.embedding_model;
        let body = ApiBatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| ApiEmbedRequest {
                    model: format!("models/{model}"),
                    content: ApiContent::text(None, text),
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{API_BASE}/models/{model}:batchEmbedContents"))
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let parsed: ApiBatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Error::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents = request
        .contents
        .iter()
        .map(|c| ApiContent::text(Some(c.role.as_str()), &c.text))
        .collect();

    let generation_config = if request.temperature.is_some() || request.max_output_tokens.is_some()
    {
        Some(ApiGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        })
    } else {
        None
    };

    ApiRequest {
        contents,
        system_instruction: request
            .system
            .as_deref()
            .map(|s| ApiContent::text(None, s)),
        generation_config,
    }
}

fn parse_response(api_response: ApiResponse) -> Result<Response, Error> {
    if let Some(reason) = api_response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(Error::Blocked(reason));
    }

    let candidate = api_response
        .candidates
        .into_iter()
        .next()
        .ok_or(Error::EmptyResponse)?;

    let parts = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(Response {
        model: api_response.model_version,
        parts,
        finish_reason: candidate
            .finish_reason
            .as_deref()
            .map(FinishReason::parse)
            .unwrap_or(FinishReason::Stop),
        usage: api_response.usage_metadata.map(ApiUsage::into_usage).unwrap_or_default(),
    })
}

// ============================================================================
// Public types
// ============================================================================

/// A generation request to send to Gemini.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub system: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
}

impl Request {
    /// Create a new request with the given conversation contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            model: None,
            system: None,
            contents,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// One turn of conversation content.
#[derive(Debug, Clone)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

impl Content {
    /// Create user content.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create model content.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// The role of a content author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A generation response from Gemini.
#[derive(Debug, Clone)]
pub struct Response {
    pub model: Option<String>,
    pub parts: Vec<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl Response {
    /// Get all text parts concatenated.
    pub fn text(&self) -> String {
        self.parts.concat()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl FinishReason {
    fn parse(s: &str) -> Self {
        match s {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub output_tokens: usize,
}


// ============================================================================
// Streaming types
// ============================================================================

/// Events from a streaming response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta { text: String },
    Finished { reason: FinishReason },
    Usage(Usage),
    Error { message: String },
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

impl ApiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![ApiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl ApiUsage {
    fn into_usage(self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_token_count,
            output_tokens: self.candidates_token_count,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiEmbedRequest {
    model: String,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
struct ApiBatchEmbedRequest {
    requests: Vec<ApiEmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedResponse {
    embedding: ApiEmbedding,
}

#[derive(Debug, Deserialize)]
struct ApiBatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ApiEmbedding>,
}

/// Parse SSE events from a buffer, consuming complete lines and leaving incomplete data.
///
/// Each `data:` line carries one JSON response chunk. Lines without a trailing
/// newline stay in the buffer for the next network chunk. A terminated line
/// that fails to parse is reported and dropped.
fn parse_sse_events_buffered(buffer: &mut String) -> Vec<Result<StreamEvent, Error>> {
    let mut events = Vec::new();

    loop {
        let Some(newline_pos) = buffer.find('\n') else {
            break;
        };

        let line = buffer[..newline_pos].trim_end_matches('\r');

        if let Some(json_str) = line.strip_prefix("data:") {
            let json_str = json_str.trim_start();
            if !json_str.is_empty() {
                match serde_json::from_str::<ApiResponse>(json_str) {
                    Ok(chunk) => events.extend(convert_stream_chunk(chunk).into_iter().map(Ok)),
                    Err(e) => events.push(Err(Error::Parse(format!("SSE parse error: {e}")))),
                }
            }
        }
        // Skip event:, id:, comments and blank separators

        buffer.drain(..=newline_pos);
    }

    events
}

fn convert_stream_chunk(chunk: ApiResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        events.push(StreamEvent::Error {
            message: format!("prompt blocked: {reason}"),
        });
        return events;
    }

    for candidate in chunk.candidates {
        if let Some(content) = candidate.content {
            for text in content.parts.into_iter().filter_map(|p| p.text) {
                if !text.is_empty() {
                    events.push(StreamEvent::TextDelta { text });
                }
            }
        }
        if let Some(reason) = candidate.finish_reason {
            events.push(StreamEvent::Finished {
                reason: FinishReason::parse(&reason),
            });
        }
    }

    if let Some(usage) = chunk.usage_metadata {
        events.push(StreamEvent::Usage(usage.into_usage()));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.embedding_model(), DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_client_with_models() {
        let client = Gemini::new("test-key")
            .with_model("gemini-1.5-pro")
            .with_embedding_model("embedding-001");
        assert_eq!(client.model(), "gemini-1.5-pro");
        assert_eq!(client.embedding_model(), "embedding-001");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Content::user("Hello")])
            .with_system("You are a storyteller")
            .with_max_output_tokens(1000)
            .with_temperature(0.7);

        assert_eq!(request.max_output_tokens, Some(1000));
        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_request_serialization() {
        let request = Request::new(vec![Content::user("Hi"), Content::model("Hello")])
            .with_system("Be brief")
            .with_temperature(0.5);
        let json = serde_json::to_value(build_api_request(&request)).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_request_without_generation_config() {
        let request = Request::new(vec![Content::user("Hi")]);
        let json = serde_json::to_value(build_api_request(&request)).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_response_text() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Story: "}, {"text": "The door creaked."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5},
            "modelVersion": "gemini-2.0-flash"
        }"#;
        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        let response = parse_response(api).unwrap();

        assert_eq!(response.text(), "Story: The door creaked.");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.prompt_tokens, 12);
        assert_eq!(response.usage.output_tokens, 5);
        assert_eq!(response.model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn test_parse_blocked_response() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(parse_response(api), Err(Error::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_parse_empty_response() {
        let api: ApiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(parse_response(api), Err(Error::EmptyResponse)));
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::Network("reset".into()).is_transient());
        assert!(Error::Api { status: 429, message: String::new() }.is_transient());
        assert!(Error::Api { status: 503, message: String::new() }.is_transient());
        assert!(!Error::Api { status: 400, message: String::new() }.is_transient());
        assert!(!Error::Blocked("SAFETY".into()).is_transient());
        assert!(!Error::NoApiKey.is_transient());
    }

    #[test]
    fn test_sse_split_across_chunks() {
        let mut buffer = String::from(
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"Once\"}]}}]}\r\n\r\ndata: {\"candidates\": [{\"content\": {\"parts\": [{\"te",
        );
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(StreamEvent::TextDelta { text }) if text == "Once"));
        assert!(buffer.starts_with("data: "));

        buffer.push_str("xt\": \" upon\"}]}, \"finishReason\": \"STOP\"}]}\r\n\r\n");
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Ok(StreamEvent::TextDelta { text }) if text == " upon"));
        assert!(matches!(
            &events[1],
            Ok(StreamEvent::Finished { reason: FinishReason::Stop })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sse_invalid_json_reported() {
        let mut buffer = String::from("data: {not json}\n");
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(Error::Parse(_))));
    }

    #[test]
    fn test_sse_truncated_line_does_not_block_later_events() {
        let mut buffer = String::from(
            "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"lost\"\n\n\
             data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"next\"}]}}]}\n\n",
        );
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Err(Error::Parse(_))));
        assert!(matches!(&events[1], Ok(StreamEvent::TextDelta { text }) if text == "next"));
        assert!(buffer.is_empty());

        buffer.push_str("data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"third\"}]}}]}\n\n");
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(StreamEvent::TextDelta { text }) if text == "third"));
    }

    #[test]
    fn test_embed_response_parsing() {
        let single: ApiEmbedResponse =
            serde_json::from_str(r#"{"embedding": {"values": [0.1, 0.2, 0.3]}}"#).unwrap();
        assert_eq!(single.embedding.values.len(), 3);

        let batch: ApiBatchEmbedResponse = serde_json::from_str(
            r#"{"embeddings": [{"values": [1.0]}, {"values": [2.0]}]}"#,
        )
        .unwrap();
        assert_eq!(batch.embeddings.len(), 2);
        assert_eq!(batch.embeddings[1].values, vec![2.0]);
    }
}
