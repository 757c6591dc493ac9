//! Prompt composition.
//!
//! A prompt is built from up to five sections, always in this order:
//! 1. few-shot exemplars
//! 2. the story so far
//! 3. retrieved knowledge
//! 4. the user's directive
//! 5. the generation cue
//!
//! Sections are separated by a blank line. An empty section is left out
//! entirely, header included.

use super::history::StoryHistory;
use crate::directive::TurnRequest;
use serde::{Deserialize, Serialize};

/// The cue the prompt ends with, and which models sometimes echo back.
pub const STORY_CUE: &str = "Story:";

const SECTION_SEPARATOR: &str = "\n\n";
const HISTORY_HEADER: &str = "The story so far:";
const KNOWLEDGE_HEADER: &str = "Consider this retrieved knowledge to enrich the story:";
const DIRECTIVE_LEAD: &str = "Now, continue the story based on the user's input:";

/// What a few-shot exemplar illustrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExampleCategory {
    Emotion,
    Situation,
}

impl ExampleCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ExampleCategory::Emotion => "Core Emotion",
            ExampleCategory::Situation => "Brief Situation",
        }
    }
}

/// A fixed exemplar included in every prompt to steer style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub category: ExampleCategory,
    pub label: String,
    pub exemplar_text: String,
}

impl FewShotExample {
    pub fn new(
        category: ExampleCategory,
        label: impl Into<String>,
        exemplar_text: impl Into<String>,
    ) -> Self {
        Self {
            category,
            label: label.into(),
            exemplar_text: exemplar_text.into(),
        }
    }

    fn render(&self) -> String {
        format!(
            "{}: {}\n{STORY_CUE} {}",
            self.category.label(),
            self.label,
            self.exemplar_text
        )
    }
}

/// Builds prompts from exemplars, history, retrieved passages and a directive.
///
/// Composition is a pure function of its inputs: the same arguments always
/// produce the same bytes.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    examples: Vec<FewShotExample>,
    history_delimiter: String,
}

impl PromptComposer {
    pub fn new(examples: Vec<FewShotExample>) -> Self {
        Self {
            examples,
            history_delimiter: "\n\n".to_string(),
        }
    }

    pub fn with_history_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.history_delimiter = delimiter.into();
        self
    }

    pub fn examples(&self) -> &[FewShotExample] {
        &self.examples
    }

    pub fn compose(
        &self,
        history: &StoryHistory,
        retrieved: &[&str],
        request: &TurnRequest,
    ) -> String {
        let mut sections: Vec<String> = Vec::with_capacity(5);

        if !self.examples.is_empty() {
            let mut section = include_str!("prompts/examples_header.txt")
                .trim_end()
                .to_string();
            for example in &self.examples {
                section.push_str(SECTION_SEPARATOR);
                section.push_str(&example.render());
            }
            sections.push(section);
        }

        if !history.is_empty() {
            sections.push(format!(
                "{HISTORY_HEADER}\n{}",
                history.joined(&self.history_delimiter)
            ));
        }

        let passages: Vec<&str> = retrieved
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if !passages.is_empty() {
            sections.push(format!("{KNOWLEDGE_HEADER}\n{}", passages.join("\n")));
        }

        sections.push(format!("{DIRECTIVE_LEAD} {}", request.describe()));
        sections.push(STORY_CUE.to_string());

        sections.join(SECTION_SEPARATOR)
    }
}

/// Compose a prompt with the default history delimiter.
pub fn compose_prompt(
    examples: &[FewShotExample],
    history: &StoryHistory,
    retrieved: &[&str],
    request: &TurnRequest,
) -> String {
    PromptComposer::new(examples.to_vec()).compose(history, retrieved, request)
}

/// Clean up raw model output into a story segment.
///
/// Trims whitespace and strips any leading echo of the cue. Returns `None`
/// when nothing usable is left.
pub fn normalize_response(raw: &str, cue: &str) -> Option<String> {
    let mut text = raw.trim();
    if !cue.is_empty() {
        while let Some(rest) = text.strip_prefix(cue) {
            text = rest.trim_start();
        }
    }
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrator::default_examples;

    fn composer() -> PromptComposer {
        PromptComposer::new(vec![
            FewShotExample::new(ExampleCategory::Emotion, "Dread", "The silence stretched."),
            FewShotExample::new(ExampleCategory::Situation, "Locked door", "The bolt wouldn't budge."),
        ])
    }

    #[test]
    fn test_minimal_prompt() {
        let prompt = PromptComposer::new(Vec::new()).compose(
            &StoryHistory::new(),
            &[],
            &TurnRequest::emotion("Dread"),
        );
        assert_eq!(
            prompt,
            "Now, continue the story based on the user's input: User guides with emotion: Dread\n\nStory:"
        );
    }

    #[test]
    fn test_full_prompt_layout() {
        let history = StoryHistory::from(vec!["First part.".to_string(), "Second part.".to_string()]);
        let prompt = composer().compose(
            &history,
            &["An old house.", "A missing photograph."],
            &TurnRequest::situation("Stuck elevator"),
        );

        let expected = "Here are some examples of short stories based on a core emotion or a brief situation, often with a psychological twist:\n\n\
Core Emotion: Dread\nStory: The silence stretched.\n\n\
Brief Situation: Locked door\nStory: The bolt wouldn't budge.\n\n\
The story so far:\nFirst part.\n\nSecond part.\n\n\
Consider this retrieved knowledge to enrich the story:\nAn old house.\nA missing photograph.\n\n\
Now, continue the story based on the user's input: User guides with situation: Stuck elevator\n\n\
Story:";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_sections_in_order() {
        let history = StoryHistory::from(vec!["HISTORY-MARK".to_string()]);
        let prompt = PromptComposer::new(default_examples()).compose(
            &history,
            &["KNOWLEDGE-MARK"],
            &TurnRequest::emotion("DIRECTIVE-MARK"),
        );

        let examples = prompt.find("Core Emotion: Dread").unwrap();
        let story = prompt.find("HISTORY-MARK").unwrap();
        let knowledge = prompt.find("KNOWLEDGE-MARK").unwrap();
        let directive = prompt.find("DIRECTIVE-MARK").unwrap();
        assert!(examples < story && story < knowledge && knowledge < directive);
        assert!(prompt.ends_with("\n\nStory:"));
    }

    #[test]
    fn test_empty_sections_leave_no_residue() {
        let prompt = composer().compose(&StoryHistory::new(), &["", "  "], &TurnRequest::emotion("Awe"));
        assert!(!prompt.contains(HISTORY_HEADER));
        assert!(!prompt.contains(KNOWLEDGE_HEADER));
        assert!(!prompt.contains("\n\n\n"));
        assert!(!prompt.starts_with('\n'));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let history = StoryHistory::from(vec!["One.".to_string()]);
        let request = TurnRequest::emotion("Betrayal").with_character("Ivo");
        let a = composer().compose(&history, &["ctx"], &request);
        let b = composer().compose(&history, &["ctx"], &request);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_compose_prompt_matches_composer() {
        let history = StoryHistory::from(vec!["One.".to_string()]);
        let request = TurnRequest::situation("A knock at midnight");
        let examples = default_examples();
        assert_eq!(
            compose_prompt(&examples, &history, &["ctx"], &request),
            PromptComposer::new(examples.clone()).compose(&history, &["ctx"], &request)
        );
    }

    #[test]
    fn test_custom_history_delimiter() {
        let history = StoryHistory::from(vec!["a".to_string(), "b".to_string()]);
        let prompt = PromptComposer::new(Vec::new())
            .with_history_delimiter("\n---\n")
            .compose(&history, &[], &TurnRequest::emotion("Fear"));
        assert!(prompt.contains("The story so far:\na\n---\nb"));
    }

    #[test]
    fn test_normalize_response() {
        assert_eq!(
            normalize_response("  Story: The lights went out.  ", STORY_CUE).as_deref(),
            Some("The lights went out.")
        );
        assert_eq!(
            normalize_response("Story:\nStory: Twice.", STORY_CUE).as_deref(),
            Some("Twice.")
        );
        assert_eq!(
            normalize_response("She wrote \"Story: unfinished\".", STORY_CUE).as_deref(),
            Some("She wrote \"Story: unfinished\".")
        );
        assert_eq!(normalize_response("  Story:   ", STORY_CUE), None);
        assert_eq!(normalize_response("", STORY_CUE), None);
    }
}
