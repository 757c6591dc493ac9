//! Testing utilities for story sessions.
//!
//! This module provides tools for integration testing:
//! - `ScriptedModel` for deterministic generation without API calls
//! - `KeywordEmbedder` for reproducible embeddings over a few themes
//! - `TestHarness` for scripted story scenarios
//! - Assertion helpers for verifying session state

use crate::directive::TurnRequest;
use crate::knowledge::{default_corpus, KnowledgeDocument, KnowledgeStore};
use crate::narrator::{Narrator, TurnOutcome};
use crate::services::{ConversationId, Embedder, LanguageModel, ServiceError};
use crate::session::{SessionError, SessionState, StorySession};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A scripted reply from the mock model.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(ServiceError),
}

/// A language model that returns scripted replies in order.
///
/// Every prompt it receives is recorded so tests can inspect exactly what
/// the narrator sent.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    conversations: Mutex<Vec<ConversationId>>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| ScriptedReply::Text(r.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Add a reply to the end of the queue.
    pub fn queue_reply(&self, text: impl Into<String>) {
        lock(&self.replies).push_back(ScriptedReply::Text(text.into()));
    }

    /// Add a failure to the end of the queue.
    pub fn queue_failure(&self, error: ServiceError) {
        lock(&self.replies).push_back(ScriptedReply::Fail(error));
    }

    /// Make the very next call fail with a transient error.
    pub fn fail_next_transient(&self, message: impl Into<String>) {
        lock(&self.replies).push_front(ScriptedReply::Fail(ServiceError::transient(message)));
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.prompts).last().cloned()
    }

    /// Conversation ids seen so far, one per call.
    pub fn conversations(&self) -> Vec<ConversationId> {
        lock(&self.conversations).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn send(
        &self,
        conversation: &ConversationId,
        prompt: &str,
    ) -> Result<String, ServiceError> {
        lock(&self.prompts).push(prompt.to_string());
        lock(&self.conversations).push(*conversation);

        match lock(&self.replies).pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(error)) => Err(error),
            None => Ok("The narrator has no more scripted segments.".to_string()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Embeds text by counting keyword hits per theme.
///
/// Each theme is one axis; a token hits a theme when it starts with one of
/// the theme's keywords. A final constant axis keeps every vector non-zero,
/// so texts with no hits tie and fall back to insertion order.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    themes: Vec<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn new<S: Into<String>>(themes: Vec<Vec<S>>) -> Self {
        Self {
            themes: themes
                .into_iter()
                .map(|words| words.into_iter().map(|w| w.into().to_lowercase()).collect())
                .collect(),
        }
    }

    /// Themes matching the built-in corpus: fear, place, mystery, joy and
    /// sorrow, reflection.
    pub fn story_themes() -> Self {
        Self::new(vec![
            vec!["dread", "fear", "paranoi", "terror", "menac", "scream", "whisper"],
            vec!["house", "hill", "sea", "storm", "window", "home", "elevator"],
            vec!["prophecy", "key", "hidden", "forgotten", "ancient", "missing", "secret"],
            vec!["joy", "celebrat", "sadness", "smile", "euphoria", "happ", "grief"],
            vec!["mirror", "reflect", "face", "visage"],
        ])
    }

    /// Output dimension.
    pub fn width(&self) -> usize {
        self.themes.len() + 1
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.width()];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            for (axis, words) in self.themes.iter().enumerate() {
                if words.iter().any(|w| token.starts_with(w.as_str())) {
                    vector[axis] += 1.0;
                }
            }
        }
        vector[self.themes.len()] = 1.0;
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.width())
    }
}

/// An embedder whose every call fails with a transient error.
#[derive(Debug, Clone)]
pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ServiceError> {
        Err(ServiceError::transient("embedding service unavailable"))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

/// Knowledge store over the built-in corpus, embedded with `embedder`.
pub fn themed_store(embedder: &KeywordEmbedder) -> KnowledgeStore {
    let documents = default_corpus()
        .into_iter()
        .map(|doc| KnowledgeDocument {
            embedding: embedder.vector_for(&doc.text),
            id: doc.id,
            text: doc.text,
        })
        .collect();

    KnowledgeStore::from_embedded(documents, embedder.width())
        .expect("built-in corpus has unique ids and a fixed dimension")
}

/// Test harness for running story scenarios.
pub struct TestHarness {
    /// The session under test.
    pub session: StorySession,
    /// The scripted model behind the session's narrator.
    pub model: Arc<ScriptedModel>,
    /// The embedder shared by the store and the narrator.
    pub embedder: Arc<KeywordEmbedder>,
}

impl TestHarness {
    /// Create a harness over the built-in corpus with no identity yet.
    pub fn new() -> Self {
        let model = Arc::new(ScriptedModel::default());
        let embedder = Arc::new(KeywordEmbedder::story_themes());
        let store = themed_store(&embedder);
        let narrator = Narrator::new(model.clone(), embedder.clone(), Arc::new(store));

        Self {
            session: StorySession::new(narrator),
            model,
            embedder,
        }
    }

    /// Create a harness whose session has already accepted `name`.
    pub fn identified(name: &str) -> Self {
        let mut harness = Self::new();
        harness
            .session
            .submit_identity(name)
            .expect("test identity must be non-empty");
        harness
    }

    /// Queue a segment for the next turn.
    pub fn expect_segment(&mut self, text: impl Into<String>) -> &mut Self {
        self.model.queue_reply(text);
        self
    }

    /// Queue a model failure for the next turn.
    pub fn expect_failure(&mut self, error: ServiceError) -> &mut Self {
        self.model.queue_failure(error);
        self
    }

    /// Submit an emotion directive.
    pub async fn emotion(&mut self, value: &str) -> Result<TurnOutcome, SessionError> {
        self.session.take_turn(TurnRequest::emotion(value)).await
    }

    /// Submit a situation directive.
    pub async fn situation(&mut self, value: &str) -> Result<TurnOutcome, SessionError> {
        self.session.take_turn(TurnRequest::situation(value)).await
    }

    pub fn story_len(&self) -> usize {
        self.session.history().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.model.last_prompt()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the story has exactly `len` segments.
#[track_caller]
pub fn assert_story_len(harness: &TestHarness, len: usize) {
    assert_eq!(
        harness.story_len(),
        len,
        "Expected {len} story segments, got {}",
        harness.story_len()
    );
}

/// Assert the session is in `state`.
#[track_caller]
pub fn assert_state(harness: &TestHarness, state: SessionState) {
    assert_eq!(
        harness.session.state(),
        state,
        "Expected session state {state:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_order() {
        let model = ScriptedModel::new(vec!["one", "two"]);
        let id = ConversationId::new();

        assert_eq!(model.send(&id, "p1").await.unwrap(), "one");
        assert_eq!(model.send(&id, "p2").await.unwrap(), "two");
        assert!(model
            .send(&id, "p3")
            .await
            .unwrap()
            .contains("no more scripted"));
        assert_eq!(model.prompts(), vec!["p1", "p2", "p3"]);
        assert_eq!(model.conversations(), vec![id, id, id]);
    }

    #[tokio::test]
    async fn test_fail_next_jumps_the_queue() {
        let model = ScriptedModel::new(vec!["ok"]);
        model.fail_next_transient("busy");
        let id = ConversationId::new();

        let err = model.send(&id, "p").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(model.send(&id, "p").await.unwrap(), "ok");
        assert_eq!(model.remaining(), 0);
    }

    #[test]
    fn test_keyword_embedder() {
        let embedder = KeywordEmbedder::story_themes();
        assert_eq!(embedder.width(), 6);

        let v = embedder.vector_for("Paranoid whispers in the old house");
        assert_eq!(v, vec![2.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

        let none = embedder.vector_for("nothing relevant");
        assert_eq!(none, vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_failing_embedder() {
        let embedder = FailingEmbedder::new(3);
        assert!(embedder.embed("x").await.is_err());
        assert_eq!(embedder.dimension(), Some(3));
    }

    #[test]
    fn test_themed_store() {
        let embedder = KeywordEmbedder::story_themes();
        let store = themed_store(&embedder);
        assert_eq!(store.len(), 5);
        assert_eq!(store.dimension(), 6);
    }

    #[tokio::test]
    async fn test_harness_basic_turn() {
        let mut harness = TestHarness::identified("Ava");
        harness.expect_segment("The lights flickered.");

        let outcome = harness.emotion("Dread").await.unwrap();

        assert_eq!(outcome.segment, "The lights flickered.");
        assert_story_len(&harness, 1);
        assert_state(&harness, SessionState::AwaitingContinuation);
        assert_eq!(harness.last_prompt(), Some(outcome.prompt));
    }
}
