//! Per-turn user guidance.
//!
//! A [`TurnRequest`] is built fresh for every turn and never persisted. Its
//! [`describe`](TurnRequest::describe) text is both what the narrator shows the
//! model and what gets embedded for retrieval.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from building a directive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Directive value must not be empty")]
    EmptyDirective,

    #[error("Unknown {kind}: {value}")]
    UnknownOption { kind: &'static str, value: String },
}

/// How the user steers the next story segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectiveKind {
    Emotion,
    Situation,
}

impl DirectiveKind {
    pub fn name(&self) -> &'static str {
        match self {
            DirectiveKind::Emotion => "emotion",
            DirectiveKind::Situation => "situation",
        }
    }
}

impl FromStr for DirectiveKind {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "emotion" | "e" => Ok(DirectiveKind::Emotion),
            "situation" | "s" => Ok(DirectiveKind::Situation),
            _ => Err(DirectiveError::UnknownOption {
                kind: "directive kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Story genres offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Horror,
    Mystery,
    Fantasy,
    ScienceFiction,
    Romance,
    Thriller,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Horror,
        Genre::Mystery,
        Genre::Fantasy,
        Genre::ScienceFiction,
        Genre::Romance,
        Genre::Thriller,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Genre::Horror => "Horror",
            Genre::Mystery => "Mystery",
            Genre::Fantasy => "Fantasy",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Romance => "Romance",
            Genre::Thriller => "Thriller",
        }
    }

    /// Instruction appended to the directive when this genre is selected.
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            Genre::Horror => "lean into creeping fear and the uncanny",
            Genre::Mystery => "plant clues and withhold the full truth",
            Genre::Fantasy => "let magic and old powers shape events",
            Genre::ScienceFiction => "ground the strangeness in technology or science",
            Genre::Romance => "center the longing between characters",
            Genre::Thriller => "keep the pace tight and the stakes rising",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "horror" => Ok(Genre::Horror),
            "mystery" => Ok(Genre::Mystery),
            "fantasy" => Ok(Genre::Fantasy),
            "science fiction" | "scifi" | "sci fi" => Ok(Genre::ScienceFiction),
            "romance" => Ok(Genre::Romance),
            "thriller" => Ok(Genre::Thriller),
            _ => Err(DirectiveError::UnknownOption {
                kind: "genre",
                value: s.to_string(),
            }),
        }
    }
}

/// Narrative tones offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    Dark,
    Whimsical,
    Suspenseful,
    Melancholic,
    Hopeful,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Dark,
        Tone::Whimsical,
        Tone::Suspenseful,
        Tone::Melancholic,
        Tone::Hopeful,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Dark => "Dark",
            Tone::Whimsical => "Whimsical",
            Tone::Suspenseful => "Suspenseful",
            Tone::Melancholic => "Melancholic",
            Tone::Hopeful => "Hopeful",
        }
    }

    pub fn prompt_hint(&self) -> &'static str {
        match self {
            Tone::Dark => "keep the mood bleak and heavy",
            Tone::Whimsical => "allow playful, dreamlike turns",
            Tone::Suspenseful => "hold back resolution and build tension",
            Tone::Melancholic => "let loss and quiet regret color the prose",
            Tone::Hopeful => "leave room for light at the end",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Tone::Dark),
            "whimsical" => Ok(Tone::Whimsical),
            "suspenseful" => Ok(Tone::Suspenseful),
            "melancholic" | "melancholy" => Ok(Tone::Melancholic),
            "hopeful" => Ok(Tone::Hopeful),
            _ => Err(DirectiveError::UnknownOption {
                kind: "tone",
                value: s.to_string(),
            }),
        }
    }
}

/// The user's guidance for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub kind: DirectiveKind,
    pub value: String,
    pub genre: Option<Genre>,
    pub tone: Option<Tone>,
    pub character: Option<String>,
    pub setting: Option<String>,
    /// Free-form extra parameters, rendered in key order.
    pub extra: BTreeMap<String, String>,
}

impl TurnRequest {
    pub fn new(kind: DirectiveKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            genre: None,
            tone: None,
            character: None,
            setting: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn emotion(value: impl Into<String>) -> Self {
        Self::new(DirectiveKind::Emotion, value)
    }

    pub fn situation(value: impl Into<String>) -> Self {
        Self::new(DirectiveKind::Situation, value)
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = Some(genre);
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    pub fn with_setting(mut self, setting: impl Into<String>) -> Self {
        self.setting = Some(setting.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Reject directives with nothing to steer by.
    pub fn validate(&self) -> Result<(), DirectiveError> {
        if self.value.trim().is_empty() {
            return Err(DirectiveError::EmptyDirective);
        }
        Ok(())
    }

    /// Canonical text of this directive.
    ///
    /// The first line is always `User guides with <kind>: <value>`; each
    /// auxiliary parameter adds one line in a fixed order.
    pub fn describe(&self) -> String {
        let mut text = format!("User guides with {}: {}", self.kind.name(), self.value.trim());

        if let Some(genre) = self.genre {
            text.push_str(&format!("\nGenre: {} ({})", genre.label(), genre.prompt_hint()));
        }
        if let Some(tone) = self.tone {
            text.push_str(&format!("\nTone: {} ({})", tone.label(), tone.prompt_hint()));
        }
        if let Some(character) = self.character.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            text.push_str(&format!("\nCharacter: {character}"));
        }
        if let Some(setting) = self.setting.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            text.push_str(&format!("\nSetting: {setting}"));
        }
        for (key, value) in &self.extra {
            text.push_str(&format!("\n{key}: {value}"));
        }

        text
    }
}
