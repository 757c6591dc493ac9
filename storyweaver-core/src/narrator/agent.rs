//! The narrator - runs one story turn end to end.
//!
//! A turn embeds the directive, pulls the closest reference passages,
//! composes the prompt, asks the language model for a continuation and
//! cleans up the reply. The narrator never touches the caller's history:
//! appending the returned segment is the session's job, which keeps turns
//! atomic.

use super::exemplars::default_examples;
use super::history::StoryHistory;
use super::prompt::{normalize_response, FewShotExample, PromptComposer, STORY_CUE};
use crate::directive::{DirectiveError, TurnRequest};
use crate::knowledge::{KnowledgeError, KnowledgeStore};
use crate::services::{ConversationId, Embedder, LanguageModel};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a turn.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error("Generation failed: {reason}")]
    GenerationFailed { reason: String, transient: bool },

    #[error("Invalid directive: {0}")]
    Directive(#[from] DirectiveError),
}

impl TurnError {
    /// Whether resubmitting the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TurnError::GenerationFailed { transient: true, .. })
    }
}

/// Problems that degraded a turn without aborting it.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnWarning {
    /// The directive could not be embedded, so no context was retrieved.
    EmbeddingUnavailable(String),
    /// The knowledge store rejected the query.
    RetrievalFailed(KnowledgeError),
}

impl fmt::Display for TurnWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnWarning::EmbeddingUnavailable(reason) => {
                write!(f, "embedding unavailable, continuing without retrieved context: {reason}")
            }
            TurnWarning::RetrievalFailed(err) => {
                write!(f, "retrieval failed, continuing without retrieved context: {err}")
            }
        }
    }
}

/// A reference passage that was folded into the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub id: String,
    pub text: String,
    pub similarity: f32,
}

/// Result of a successful turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The cleaned-up story segment.
    pub segment: String,

    /// The exact prompt that was sent.
    pub prompt: String,

    /// Passages included in the prompt, most similar first.
    pub retrieved: Vec<RetrievedPassage>,

    pub warnings: Vec<TurnWarning>,
}

/// Configuration for the narrator.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// Number of passages retrieved per turn.
    pub top_k: usize,

    /// Dimension of the embedding space shared by documents and directives.
    pub embedding_dimension: usize,

    /// Few-shot exemplars, in prompt order.
    pub examples: Vec<FewShotExample>,

    /// Separator placed between history segments in the prompt.
    pub history_delimiter: String,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            embedding_dimension: gemini::DEFAULT_EMBEDDING_DIMENSION,
            examples: default_examples(),
            history_delimiter: "\n\n".to_string(),
        }
    }
}

/// The prompt asking the model to greet `name` and explain the story flow.
pub fn introduction_prompt(name: &str) -> String {
    include_str!("prompts/introduction.txt")
        .trim_end()
        .replace("{name}", name)
}

/// The AI narrator.
#[derive(Clone)]
pub struct Narrator {
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    knowledge: Arc<KnowledgeStore>,
    composer: PromptComposer,
    top_k: usize,
}

impl Narrator {
    /// Create a narrator with the default configuration.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        knowledge: Arc<KnowledgeStore>,
    ) -> Self {
        Self {
            model,
            embedder,
            knowledge,
            composer: PromptComposer::new(default_examples()),
            top_k: 2,
        }
    }

    /// Configure the narrator.
    pub fn with_config(mut self, config: NarratorConfig) -> Self {
        if config.embedding_dimension != self.knowledge.dimension() {
            tracing::warn!(
                configured = config.embedding_dimension,
                store = self.knowledge.dimension(),
                "embedding dimension differs from the knowledge store; retrieval will be skipped"
            );
        }
        self.composer =
            PromptComposer::new(config.examples).with_history_delimiter(config.history_delimiter);
        self.top_k = config.top_k.max(1);
        self
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Run one turn and return the new segment.
    ///
    /// `history` is only read. On error nothing about the story has changed
    /// and the same request may be submitted again.
    pub async fn execute_turn(
        &self,
        conversation: &ConversationId,
        request: &TurnRequest,
        history: &StoryHistory,
    ) -> Result<TurnOutcome, TurnError> {
        request.validate()?;

        let directive = request.describe();
        let mut warnings = Vec::new();
        let retrieved = self.retrieve(&directive, &mut warnings).await;

        let texts: Vec<&str> = retrieved.iter().map(|p| p.text.as_str()).collect();
        let prompt = self.composer.compose(history, &texts, request);

        tracing::debug!(
            %conversation,
            kind = request.kind.name(),
            history = history.len(),
            retrieved = ?retrieved.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            prompt_chars = prompt.len(),
            "composed turn prompt"
        );

        let raw = self
            .model
            .send(conversation, &prompt)
            .await
            .map_err(|e| TurnError::GenerationFailed {
                transient: e.is_transient(),
                reason: e.message,
            })?;

        let segment =
            normalize_response(&raw, STORY_CUE).ok_or_else(|| TurnError::GenerationFailed {
                reason: "model returned no usable text".to_string(),
                transient: true,
            })?;

        tracing::info!(%conversation, chars = segment.len(), "turn generated a segment");

        Ok(TurnOutcome {
            segment,
            prompt,
            retrieved,
            warnings,
        })
    }

    /// Ask the model to greet the user by name.
    pub async fn introduce(
        &self,
        conversation: &ConversationId,
        name: &str,
    ) -> Result<String, TurnError> {
        let prompt = introduction_prompt(name);

        let raw = self
            .model
            .send(conversation, &prompt)
            .await
            .map_err(|e| TurnError::GenerationFailed {
                transient: e.is_transient(),
                reason: e.message,
            })?;

        let text = raw.trim();
        if text.is_empty() {
            return Err(TurnError::GenerationFailed {
                reason: "model returned an empty introduction".to_string(),
                transient: true,
            });
        }
        Ok(text.to_string())
    }

    /// Best-effort retrieval: failures become warnings and yield no passages.
    async fn retrieve(
        &self,
        directive: &str,
        warnings: &mut Vec<TurnWarning>,
    ) -> Vec<RetrievedPassage> {
        let vector = match self.embedder.embed(directive).await {
            Ok(vector) => vector,
            Err(e) => {
                let warning = TurnWarning::EmbeddingUnavailable(e.message);
                tracing::warn!("{warning}");
                warnings.push(warning);
                return Vec::new();
            }
        };

        match self.knowledge.query(&vector, self.top_k) {
            Ok(result) => result
                .iter()
                .map(|m| RetrievedPassage {
                    id: m.document.id.clone(),
                    text: m.document.text.clone(),
                    similarity: m.similarity,
                })
                .collect(),
            Err(e) => {
                let warning = TurnWarning::RetrievalFailed(e);
                tracing::warn!("{warning}");
                warnings.push(warning);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::default_corpus;
    use crate::testing::{FailingEmbedder, KeywordEmbedder, ScriptedModel};

    async fn narrator_with(model: Arc<ScriptedModel>) -> Narrator {
        let embedder = Arc::new(KeywordEmbedder::story_themes());
        let store = KnowledgeStore::load(default_corpus(), embedder.as_ref(), embedder.width())
            .await
            .unwrap();
        Narrator::new(model, embedder, Arc::new(store))
    }

    #[tokio::test]
    async fn test_turn_retrieves_and_normalizes() {
        let model = Arc::new(ScriptedModel::new(vec!["Story:  The hallway narrowed. "]));
        let narrator = narrator_with(model.clone()).await;

        let outcome = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::emotion("Dread"),
                &StoryHistory::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.segment, "The hallway narrowed.");
        assert_eq!(outcome.retrieved.len(), 2);
        assert_eq!(outcome.retrieved[0].id, "doc_1");
        assert!(outcome.warnings.is_empty());
        assert!(outcome.prompt.contains("paranoia"));
        assert_eq!(model.prompts(), vec![outcome.prompt.clone()]);
    }

    #[tokio::test]
    async fn test_history_is_not_modified() {
        let model = Arc::new(ScriptedModel::new(vec!["More."]));
        let narrator = narrator_with(model).await;
        let history = StoryHistory::from(vec!["Earlier.".to_string()]);

        let outcome = narrator
            .execute_turn(&ConversationId::new(), &TurnRequest::emotion("Awe"), &history)
            .await
            .unwrap();

        assert_eq!(history.len(), 1);
        assert!(outcome.prompt.contains("The story so far:\nEarlier."));
    }

    #[tokio::test]
    async fn test_model_failure_is_generation_failed() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        model.fail_next_transient("quota exceeded");
        let narrator = narrator_with(model).await;

        let err = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::situation("Broken mirror"),
                &StoryHistory::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::GenerationFailed { ref reason, .. } if reason.contains("quota")));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_reply_is_generation_failed() {
        let model = Arc::new(ScriptedModel::new(vec!["  Story:  "]));
        let narrator = narrator_with(model).await;

        let err = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::emotion("Joy"),
                &StoryHistory::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::GenerationFailed { .. }));
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_warning() {
        let model = Arc::new(ScriptedModel::new(vec!["Without context."]));
        let themes = KeywordEmbedder::story_themes();
        let store = KnowledgeStore::load(default_corpus(), &themes, themes.width())
            .await
            .unwrap();
        let narrator = Narrator::new(
            model,
            Arc::new(FailingEmbedder::new(themes.width())),
            Arc::new(store),
        );

        let outcome = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::emotion("Dread"),
                &StoryHistory::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.segment, "Without context.");
        assert!(outcome.retrieved.is_empty());
        assert!(matches!(
            outcome.warnings.as_slice(),
            [TurnWarning::EmbeddingUnavailable(_)]
        ));
        assert!(!outcome.prompt.contains("retrieved knowledge"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_degrades_to_warning() {
        let model = Arc::new(ScriptedModel::new(vec!["Still here."]));
        let themes = KeywordEmbedder::story_themes();
        let store = KnowledgeStore::load(default_corpus(), &themes, themes.width())
            .await
            .unwrap();
        let narrator = Narrator::new(
            model,
            Arc::new(KeywordEmbedder::new(vec![vec!["dread"]])),
            Arc::new(store),
        );

        let outcome = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::emotion("Dread"),
                &StoryHistory::new(),
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome.warnings.as_slice(),
            [TurnWarning::RetrievalFailed(KnowledgeError::DimensionMismatch { .. })]
        ));
    }

    #[tokio::test]
    async fn test_top_k_config() {
        let model = Arc::new(ScriptedModel::new(vec!["x"]));
        let narrator = narrator_with(model).await.with_config(NarratorConfig {
            top_k: 10,
            examples: Vec::new(),
            ..NarratorConfig::default()
        });

        let outcome = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::emotion("Dread"),
                &StoryHistory::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.retrieved.len(), 5);
        assert!(!outcome.prompt.contains("Here are some examples"));
    }

    #[tokio::test]
    async fn test_empty_directive_rejected_before_model_call() {
        let model = Arc::new(ScriptedModel::new(vec!["unused"]));
        let narrator = narrator_with(model.clone()).await;

        let err = narrator
            .execute_turn(
                &ConversationId::new(),
                &TurnRequest::emotion("  "),
                &StoryHistory::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Directive(DirectiveError::EmptyDirective)));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_introduce_uses_name() {
        let model = Arc::new(ScriptedModel::new(vec!["  Hello Ava, I am your storyteller.  "]));
        let narrator = narrator_with(model.clone()).await;

        let intro = narrator.introduce(&ConversationId::new(), "Ava").await.unwrap();
        assert_eq!(intro, "Hello Ava, I am your storyteller.");
        assert!(model.prompts()[0].contains("Introduce yourself to Ava"));
    }
}
