//! Story history - the generated segments of one session.

use serde::{Deserialize, Serialize};

/// Ordered, append-only list of generated story segments.
///
/// The only way to shrink a history is [`clear`](StoryHistory::clear), which
/// the session calls on an explicit reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryHistory {
    segments: Vec<String>,
}

impl StoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a generated segment.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// All segments joined by `delimiter`.
    pub fn joined(&self, delimiter: &str) -> String {
        self.segments.join(delimiter)
    }

    /// Drop every segment.
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

impl From<Vec<String>> for StoryHistory {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_join() {
        let mut history = StoryHistory::new();
        assert!(history.is_empty());

        history.push("The door creaked.");
        history.push("Nobody was there.");

        assert_eq!(history.len(), 2);
        assert_eq!(history.last(), Some("Nobody was there."));
        assert_eq!(history.joined("\n\n"), "The door creaked.\n\nNobody was there.");
    }

    #[test]
    fn test_clear() {
        let mut history = StoryHistory::from(vec!["a".to_string(), "b".to_string()]);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.joined("\n"), "");
    }
}
