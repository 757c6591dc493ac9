//! Interactive story engine with retrieval-augmented prompting.
//!
//! This crate provides:
//! - A knowledge store of reference passages with cosine-similarity retrieval
//! - Prompt composition from few-shot exemplars, story history and retrieved context
//! - An AI narrator backed by Google Gemini
//! - A session state machine with save/load
//!
//! # Quick Start
//!
//! ```ignore
//! use storyweaver_core::{SessionConfig, StorySession, TurnRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = StorySession::from_env(SessionConfig::new()).await?;
//!     session.submit_identity("Ava")?;
//!
//!     let outcome = session.take_turn(TurnRequest::emotion("Dread")).await?;
//!     println!("{}", outcome.segment);
//!
//!     session.save("ava.json").await?;
//!     Ok(())
//! }
//! ```

pub mod directive;
pub mod headless;
pub mod knowledge;
pub mod narrator;
pub mod services;
pub mod session;
pub mod testing;

// Primary public API
pub use directive::{DirectiveError, DirectiveKind, Genre, Tone, TurnRequest};
pub use headless::{HeadlessConfig, HeadlessStory};
pub use knowledge::{KnowledgeError, KnowledgeStore};
pub use narrator::{Narrator, NarratorConfig, StoryHistory, TurnError, TurnOutcome, TurnWarning};
pub use services::{ConversationId, Embedder, LanguageModel, ServiceError};
pub use session::{FinalStory, SessionConfig, SessionError, SessionState, StorySession};
pub use testing::{KeywordEmbedder, ScriptedModel, TestHarness};
