//! Headless story interface for programmatic use.
//!
//! This module provides a line-oriented front over [`StorySession`]. It's
//! designed for:
//! - Terminal play without a UI
//! - Script-driven story sessions
//! - Automated testing with real AI responses
//!
//! # Example
//!
//! ```ignore
//! use storyweaver_core::headless::{HeadlessConfig, HeadlessStory};
//! use storyweaver_core::{DirectiveKind, Genre};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HeadlessConfig::quick_start("Ava").with_genre(Genre::Horror);
//!     let mut story = HeadlessStory::new(config).await?;
//!
//!     let outcome = story.send(DirectiveKind::Emotion, "Dread").await?;
//!     println!("{}", outcome.segment);
//!
//!     story.save("ava.json").await?;
//!     Ok(())
//! }
//! ```

use crate::directive::{DirectiveError, DirectiveKind, Genre, Tone, TurnRequest};
use crate::narrator::TurnOutcome;
use crate::session::{FinalStory, SessionConfig, SessionError, StorySession};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Configuration for a headless story session.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// User name; when absent the front end must ask for one.
    pub name: Option<String>,
    pub genre: Option<Genre>,
    pub tone: Option<Tone>,
    pub character: Option<String>,
    pub setting: Option<String>,
    /// Model and retrieval settings.
    pub session: SessionConfig,
}

impl HeadlessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with a known user name and default settings.
    pub fn quick_start(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = Some(genre);
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = Some(tone);
        self
    }
}

/// One line of user input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Directive { kind: DirectiveKind, value: String },
    Genre(Option<Genre>),
    Tone(Option<Tone>),
    Character(Option<String>),
    Setting(Option<String>),
    Story,
    Status,
    Reset,
    Save(String),
    Load(String),
    Stop,
    Quit,
    Help,
}

/// Errors from parsing a line of input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: #{0}. Type #help for help.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Directive(#[from] DirectiveError),
}

/// Help text listing every command.
pub const HELP: &str = "\
  emotion <text>      - Continue the story from a core emotion
  situation <text>    - Continue the story from a brief situation
  #genre <name|none>  - Set the genre (horror, mystery, fantasy, sci-fi, romance, thriller)
  #tone <name|none>   - Set the tone (dark, whimsical, suspenseful, melancholic, hopeful)
  #character <name|none> - Name the main character
  #setting <text|none>   - Describe where the story takes place
  #story              - Show the story so far
  #status             - Show session status
  #reset              - Start a new story
  #save <path>        - Save the session
  #load <path>        - Load a saved session
  #stop               - Finish the story and show it
  #quit               - Exit
  #help               - Show this help";

/// Parse one non-empty line of input.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();

    if let Some(command) = line.strip_prefix('#') {
        let (name, rest) = split_word(command);
        return match name.to_lowercase().as_str() {
            "genre" => parse_option(rest, "#genre <name|none>").map(Command::Genre),
            "tone" => parse_option(rest, "#tone <name|none>").map(Command::Tone),
            "character" => {
                optional_text(rest, "#character <name|none>").map(Command::Character)
            }
            "setting" => optional_text(rest, "#setting <text|none>").map(Command::Setting),
            "story" => Ok(Command::Story),
            "status" => Ok(Command::Status),
            "reset" => Ok(Command::Reset),
            "save" => required(rest, "#save <path>").map(Command::Save),
            "load" => required(rest, "#load <path>").map(Command::Load),
            "stop" => Ok(Command::Stop),
            "quit" | "exit" => Ok(Command::Quit),
            "help" => Ok(Command::Help),
            _ => Err(CommandError::Unknown(name.to_string())),
        };
    }

    let (word, rest) = split_word(line);
    let kind = DirectiveKind::from_str(word)
        .map_err(|_| CommandError::Usage("emotion <text> | situation <text>"))?;
    if rest.is_empty() {
        return Err(DirectiveError::EmptyDirective.into());
    }
    Ok(Command::Directive {
        kind,
        value: rest.to_string(),
    })
}

fn split_word(text: &str) -> (&str, &str) {
    match text.trim().split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text.trim(), ""),
    }
}

fn required(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

fn optional_text(rest: &str, usage: &'static str) -> Result<Option<String>, CommandError> {
    let text = required(rest, usage)?;
    if text.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

fn parse_option<T>(rest: &str, usage: &'static str) -> Result<Option<T>, CommandError>
where
    T: FromStr<Err = DirectiveError>,
{
    match optional_text(rest, usage)? {
        Some(text) => Ok(Some(text.parse()?)),
        None => Ok(None),
    }
}

/// A story session with sticky per-turn options.
///
/// Genre, tone, character and setting persist between turns and are applied
/// to every directive sent.
pub struct HeadlessStory {
    session: StorySession,
    genre: Option<Genre>,
    tone: Option<Tone>,
    character: Option<String>,
    setting: Option<String>,
}

impl HeadlessStory {
    /// Create a Gemini-backed story.
    ///
    /// Requires `GOOGLE_API_KEY` environment variable to be set.
    pub async fn new(config: HeadlessConfig) -> Result<Self, SessionError> {
        let session = StorySession::from_env(config.session.clone()).await?;
        Self::with_session(session, config)
    }

    /// Wrap an existing session, accepting the configured name if any.
    ///
    /// A blank name is ignored and the session keeps awaiting an identity,
    /// so the front end can ask for one.
    pub fn with_session(
        mut session: StorySession,
        config: HeadlessConfig,
    ) -> Result<Self, SessionError> {
        if let Some(ref name) = config.name {
            match session.submit_identity(name) {
                Ok(_) => {}
                Err(SessionError::IdentityInvalid) => {
                    tracing::warn!("configured name is blank, asking for one instead");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            session,
            genre: config.genre,
            tone: config.tone,
            character: config.character,
            setting: config.setting,
        })
    }

    /// Accept the user's name.
    pub fn identify(&mut self, name: &str) -> Result<&str, SessionError> {
        self.session.submit_identity(name)
    }

    /// Ask the narrator for its greeting.
    pub async fn introduce(&self) -> Result<String, SessionError> {
        self.session.introduce().await
    }

    /// The request a directive would produce under the current options.
    pub fn request(&self, kind: DirectiveKind, value: &str) -> TurnRequest {
        let mut request = TurnRequest::new(kind, value);
        request.genre = self.genre;
        request.tone = self.tone;
        request.character = self.character.clone();
        request.setting = self.setting.clone();
        request
    }

    /// Send a directive and return the new segment.
    pub async fn send(
        &mut self,
        kind: DirectiveKind,
        value: &str,
    ) -> Result<TurnOutcome, SessionError> {
        let request = self.request(kind, value);
        request.validate()?;
        self.session.take_turn(request).await
    }

    pub fn set_genre(&mut self, genre: Option<Genre>) {
        self.genre = genre;
    }

    pub fn set_tone(&mut self, tone: Option<Tone>) {
        self.tone = tone;
    }

    pub fn set_character(&mut self, character: Option<String>) {
        self.character = character;
    }

    pub fn set_setting(&mut self, setting: Option<String>) {
        self.setting = setting;
    }

    pub fn genre(&self) -> Option<Genre> {
        self.genre
    }

    pub fn tone(&self) -> Option<Tone> {
        self.tone
    }

    pub fn character(&self) -> Option<&str> {
        self.character.as_deref()
    }

    pub fn setting(&self) -> Option<&str> {
        self.setting.as_deref()
    }

    pub fn stop(&mut self) -> Result<FinalStory, SessionError> {
        self.session.stop()
    }

    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.session.reset()
    }

    pub fn session(&self) -> &StorySession {
        &self.session
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        self.session.save(path).await
    }

    /// Replace the session with one loaded from `path`, keeping the narrator
    /// and the current options.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let narrator = self.session.narrator().clone();
        self.session = StorySession::load(path, narrator).await?;
        Ok(())
    }
}
