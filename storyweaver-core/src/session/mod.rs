//! StorySession - the primary public API for interactive storytelling.
//!
//! A session owns one user's identity, story history and state-machine
//! position, and drives the [`Narrator`] one turn at a time. Turns take
//! `&mut self`, so two turns of the same session can never overlap.

mod state;

pub use state::{Resume, SessionEvent, SessionState, TransitionError};

use crate::directive::{DirectiveError, TurnRequest};
use crate::knowledge::{default_corpus, KnowledgeError, KnowledgeStore, SourceDocument};
use crate::narrator::{
    default_examples, FewShotExample, Narrator, NarratorConfig, StoryHistory, TurnError,
    TurnOutcome,
};
use crate::services::{ConversationId, GeminiEmbedder, GeminiModel, GenerationSettings};
use gemini::Gemini;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Identity must not be empty")]
    IdentityInvalid,

    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("Turn failed: {0}")]
    Turn(#[from] TurnError),

    #[error("Invalid directive: {0}")]
    Directive(#[from] DirectiveError),

    #[error("Knowledge store error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Saved session is inconsistent: {0}")]
    InvalidSave(String),

    #[error("No API key configured - set GOOGLE_API_KEY environment variable")]
    NoApiKey,
}

/// Configuration for creating a new story session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Generation model (defaults to the client's model).
    pub model: Option<String>,

    /// Embedding model (defaults to the client's embedding model).
    pub embedding_model: Option<String>,

    /// Output dimension of the embedding model.
    pub embedding_dimension: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Maximum output tokens per segment.
    pub max_output_tokens: Option<usize>,

    /// Passages retrieved per turn.
    pub top_k: usize,

    /// Few-shot exemplars, in prompt order.
    pub examples: Vec<FewShotExample>,

    /// Reference passages for the knowledge store.
    pub corpus: Vec<SourceDocument>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            model: None,
            embedding_model: None,
            embedding_dimension: gemini::DEFAULT_EMBEDDING_DIMENSION,
            temperature: Some(0.9),
            max_output_tokens: Some(1024),
            top_k: 2,
            examples: default_examples(),
            corpus: default_corpus(),
        }
    }

    /// Set the generation model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the embedding model and its output dimension.
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.embedding_model = Some(model.into());
        self.embedding_dimension = dimension;
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max output tokens per segment.
    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_examples(mut self, examples: Vec<FewShotExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_corpus(mut self, corpus: Vec<SourceDocument>) -> Self {
        self.corpus = corpus;
        self
    }

    /// The narrator settings implied by this configuration.
    pub fn narrator_config(&self) -> NarratorConfig {
        NarratorConfig {
            top_k: self.top_k,
            embedding_dimension: self.embedding_dimension,
            examples: self.examples.clone(),
            ..NarratorConfig::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The finished story, as shown when a session stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStory {
    pub author: String,
    pub segments: Vec<String>,
}

impl FinalStory {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments joined into one text, separated by blank lines.
    pub fn render(&self) -> String {
        self.segments.join("\n\n")
    }
}

/// An interactive story session.
pub struct StorySession {
    narrator: Narrator,
    conversation: ConversationId,
    identity: Option<String>,
    history: StoryHistory,
    state: SessionState,
}

impl StorySession {
    /// Start a session that has not yet captured a user identity.
    pub fn new(narrator: Narrator) -> Self {
        Self {
            narrator,
            conversation: ConversationId::new(),
            identity: None,
            history: StoryHistory::new(),
            state: SessionState::AwaitingIdentity,
        }
    }

    /// Build a Gemini-backed session, embedding the configured corpus.
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    pub async fn from_env(config: SessionConfig) -> Result<Self, SessionError> {
        let narrator = build_narrator(&config).await?;
        Ok(Self::new(narrator))
    }

    /// Accept the user's name. Surrounding whitespace is trimmed.
    pub fn submit_identity(&mut self, name: &str) -> Result<&str, SessionError> {
        let next = self.state.apply(SessionEvent::IdentityAccepted)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::IdentityInvalid);
        }

        tracing::info!(conversation = %self.conversation, "identity accepted");
        self.state = next;
        let identity = self.identity.insert(name.to_string());
        Ok(identity.as_str())
    }

    /// Ask the narrator to greet the identified user.
    pub async fn introduce(&self) -> Result<String, SessionError> {
        let name = self.identity.as_deref().ok_or(SessionError::IdentityInvalid)?;
        Ok(self.narrator.introduce(&self.conversation, name).await?)
    }

    /// Run one turn and append its segment to the story.
    ///
    /// On failure the history is untouched and the session returns to the
    /// state it was in before the turn, so the request can be retried.
    pub async fn take_turn(&mut self, request: TurnRequest) -> Result<TurnOutcome, SessionError> {
        let in_flight = self.state.apply(SessionEvent::DirectiveSubmitted)?;
        self.state = in_flight;

        match self
            .narrator
            .execute_turn(&self.conversation, &request, &self.history)
            .await
        {
            Ok(outcome) => {
                let next = self.state.apply(SessionEvent::TurnSucceeded)?;
                self.history.push(outcome.segment.clone());
                self.state = next;
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(conversation = %self.conversation, error = %e, "turn failed");
                self.state = self.state.apply(SessionEvent::TurnFailed)?;
                Err(e.into())
            }
        }
    }

    /// Finish the story.
    pub fn stop(&mut self) -> Result<FinalStory, SessionError> {
        self.state = self.state.apply(SessionEvent::Stop)?;
        Ok(self.final_story())
    }

    /// Clear the story and start over with the same identity.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.state = self.state.apply(SessionEvent::Reset)?;
        self.history.clear();
        self.conversation = ConversationId::new();
        Ok(())
    }

    /// Recover from a turn whose future was dropped before completing.
    pub fn abandon_turn(&mut self) -> Result<(), SessionError> {
        self.state = self.state.apply(SessionEvent::Abandon)?;
        Ok(())
    }

    /// The story so far, in final-story form.
    pub fn final_story(&self) -> FinalStory {
        FinalStory {
            author: self.identity.clone().unwrap_or_else(|| "User".to_string()),
            segments: self.history.segments().to_vec(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn history(&self) -> &StoryHistory {
        &self.history
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Save the session to a JSON file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let saved = SavedSession {
            identity: self.identity.clone(),
            conversation: self.conversation,
            state: self.state,
            history: self.history.clone(),
        };

        let content = serde_json::to_string_pretty(&saved)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load a saved session, driving it with `narrator`.
    ///
    /// A session saved mid-turn resumes in the state it had before the turn.
    /// A state that disagrees with the saved history is corrected to match
    /// it; a file with story content but no identity is rejected.
    pub async fn load(path: impl AsRef<Path>, narrator: Narrator) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path).await?;
        let saved: SavedSession = serde_json::from_str(&content)?;

        let state = saved.restored_state()?;

        Ok(Self {
            narrator,
            conversation: saved.conversation,
            identity: saved.identity,
            history: saved.history,
            state,
        })
    }
}

/// Build a Gemini-backed narrator from `config`.
pub async fn build_narrator(config: &SessionConfig) -> Result<Narrator, SessionError> {
    let mut client = Gemini::from_env().map_err(|_| SessionError::NoApiKey)?;
    if let Some(ref model) = config.model {
        client = client.with_model(model);
    }
    if let Some(ref model) = config.embedding_model {
        client = client.with_embedding_model(model);
    }

    let model = GeminiModel::new(client.clone()).with_settings(GenerationSettings {
        model: None,
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    });
    let embedder = GeminiEmbedder::new(client).with_dimension(config.embedding_dimension);

    let store =
        KnowledgeStore::load(config.corpus.clone(), &embedder, config.embedding_dimension).await?;

    Ok(Narrator::new(Arc::new(model), Arc::new(embedder), Arc::new(store))
        .with_config(config.narrator_config()))
}

/// Serializable session state for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    identity: Option<String>,
    conversation: ConversationId,
    state: SessionState,
    history: StoryHistory,
}

impl SavedSession {
    /// The state to resume in, made consistent with identity and history.
    fn restored_state(&self) -> Result<SessionState, SessionError> {
        let awaiting = if self.history.is_empty() {
            SessionState::AwaitingFirstDirective
        } else {
            SessionState::AwaitingContinuation
        };

        match (self.identity.as_deref(), self.state) {
            (None, SessionState::AwaitingIdentity) if self.history.is_empty() => {
                Ok(SessionState::AwaitingIdentity)
            }
            (None, state) => Err(SessionError::InvalidSave(format!(
                "{state:?} with {} segments but no identity",
                self.history.len()
            ))),
            (Some(name), _) if name.trim().is_empty() => {
                Err(SessionError::InvalidSave("identity is blank".to_string()))
            }
            (Some(_), SessionState::Terminal) => Ok(SessionState::Terminal),
            (Some(_), state) => {
                if state != awaiting {
                    tracing::warn!(saved = ?state, restored = ?awaiting, "saved state disagrees with history");
                }
                Ok(awaiting)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;

    #[test]
    fn test_session_config() {
        let config = SessionConfig::new()
            .with_model("gemini-1.5-pro")
            .with_embedding_model("embedding-001", 256)
            .with_top_k(3)
            .with_max_output_tokens(512);

        assert_eq!(config.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(config.embedding_dimension, 256);
        assert_eq!(config.max_output_tokens, Some(512));

        let narrator = config.narrator_config();
        assert_eq!(narrator.top_k, 3);
        assert_eq!(narrator.embedding_dimension, 256);
        assert_eq!(narrator.examples.len(), 11);
    }

    #[test]
    fn test_final_story_render() {
        let story = FinalStory {
            author: "Ava".into(),
            segments: vec!["One.".into(), "Two.".into()],
        };
        assert_eq!(story.render(), "One.\n\nTwo.");
        assert!(!story.is_empty());
    }

    #[tokio::test]
    async fn test_identity_is_trimmed() {
        let mut harness = TestHarness::new();
        assert!(matches!(
            harness.session.submit_identity("   "),
            Err(SessionError::IdentityInvalid)
        ));
        assert_eq!(harness.session.state(), SessionState::AwaitingIdentity);

        assert_eq!(harness.session.submit_identity("  Ava ").unwrap(), "Ava");
        assert_eq!(harness.session.state(), SessionState::AwaitingFirstDirective);
        assert!(harness.session.submit_identity("Bea").is_err());
    }

    #[tokio::test]
    async fn test_turn_before_identity_is_rejected() {
        let mut harness = TestHarness::new();
        harness.expect_segment("never used");

        let err = harness
            .session
            .take_turn(TurnRequest::emotion("Dread"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition(_)));
        assert!(harness.model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_story() {
        let mut harness = TestHarness::identified("Ava");
        harness.expect_segment("One.").expect_segment("Two.");
        harness.session.take_turn(TurnRequest::emotion("Fear")).await.unwrap();
        harness.session.take_turn(TurnRequest::emotion("Awe")).await.unwrap();
        let before = harness.session.conversation_id();

        harness.session.stop().unwrap();
        harness.session.reset().unwrap();

        assert!(harness.session.history().is_empty());
        assert_eq!(harness.session.state(), SessionState::AwaitingFirstDirective);
        assert_eq!(harness.session.identity(), Some("Ava"));
        assert_ne!(harness.session.conversation_id(), before);
    }

    #[tokio::test]
    async fn test_stop_before_first_turn() {
        let mut harness = TestHarness::identified("Ava");
        let story = harness.session.stop().unwrap();
        assert!(story.is_empty());
        assert_eq!(story.author, "Ava");
        assert!(harness.session.state().is_terminal());
        assert!(harness
            .session
            .take_turn(TurnRequest::emotion("Joy"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_abandon_turn_requires_turn_in_flight() {
        let mut harness = TestHarness::identified("Ava");
        assert!(matches!(
            harness.session.abandon_turn(),
            Err(SessionError::InvalidTransition(_))
        ));
    }
}
