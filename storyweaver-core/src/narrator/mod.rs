//! AI narrator module.
//!
//! Contains the prompt composer, story history and the turn controller
//! that ties retrieval and generation together.

mod agent;
mod exemplars;
pub mod history;
pub mod prompt;

pub use agent::{
    introduction_prompt, Narrator, NarratorConfig, RetrievedPassage, TurnError, TurnOutcome,
    TurnWarning,
};
pub use exemplars::default_examples;
pub use history::StoryHistory;
pub use prompt::{
    compose_prompt, normalize_response, ExampleCategory, FewShotExample, PromptComposer, STORY_CUE,
};
