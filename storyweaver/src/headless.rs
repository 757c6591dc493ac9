//! Headless mode for StoryWeaver.
//!
//! This module runs a story over stdin/stdout. It's designed for terminal
//! play as well as scripted sessions and AI agents.

use futures::{Stream, StreamExt};
use gemini::{Gemini, StreamEvent};
use storyweaver_core::headless::{parse_command, Command, HeadlessConfig, HeadlessStory, HELP};
use storyweaver_core::narrator::introduction_prompt;
use storyweaver_core::services::{ConversationId, GeminiModel, GenerationSettings};
use storyweaver_core::{DirectiveKind, SessionConfig, SessionError};
use std::io::{self, BufRead, Write};

/// Run a story in headless mode.
///
/// This provides a simple line-oriented protocol:
/// - `emotion <text>` / `situation <text>` steer the next segment
/// - Lines starting with `#` are commands (genre, tone, save, load, stop, quit, ...)
/// - Output lines are tagged: `[NARRATOR]`, `[STORY]`, `[ERROR]`, ...
pub async fn run_headless(config: HeadlessConfig) -> Result<(), SessionError> {
    println!("=== StoryWeaver ===");
    println!("Preparing the narrator...");
    let session_config = config.session.clone();
    let mut story = HeadlessStory::new(config).await?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    while story.session().identity().is_none() {
        print!("What is your name? ");
        stdout.flush().ok();
        let Some(Ok(line)) = lines.next() else {
            return Ok(());
        };
        if let Err(e) = story.identify(&line) {
            println!("[ERROR] {e}");
        }
    }

    let name = story.session().identity().unwrap_or("User").to_string();
    let conversation = story.session().conversation_id();
    if let Greeting::NothingShown { error } =
        stream_introduction(&name, &session_config, conversation).await
    {
        tracing::warn!(%conversation, %error, "streamed introduction failed, falling back");
        match story.introduce().await {
            Ok(greeting) => print_block("[NARRATOR]", &greeting),
            Err(e) => println!("[ERROR] Introduction failed: {e}"),
        }
    }

    println!("Commands:");
    println!("{HELP}");
    println!();
    println!("Begin with a core emotion or a brief situation:");
    println!();

    for line in lines {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                println!("[ERROR] {e}");
                continue;
            }
        };

        match command {
            Command::Directive { kind, value } => {
                send_directive(&mut story, kind, &value).await;
            }
            Command::Genre(genre) => {
                story.set_genre(genre);
                println!("[OK] Genre: {}", genre.map(|g| g.label()).unwrap_or("none"));
            }
            Command::Tone(tone) => {
                story.set_tone(tone);
                println!("[OK] Tone: {}", tone.map(|t| t.label()).unwrap_or("none"));
            }
            Command::Character(character) => {
                story.set_character(character);
                println!("[OK] Character: {}", story.character().unwrap_or("none"));
            }
            Command::Setting(setting) => {
                story.set_setting(setting);
                println!("[OK] Setting: {}", story.setting().unwrap_or("none"));
            }
            Command::Story => {
                let current = story.session().final_story();
                if current.is_empty() {
                    println!("[STORY] (nothing written yet)");
                } else {
                    print_block("[STORY]", &current.render());
                }
            }
            Command::Status => print_status(&story),
            Command::Reset => match story.reset() {
                Ok(()) => println!("[RESET] Starting a new story."),
                Err(e) => println!("[ERROR] {e}"),
            },
            Command::Save(path) => match story.save(&path).await {
                Ok(()) => println!("[SAVED] Story saved to {path}"),
                Err(e) => println!("[ERROR] Save failed: {e}"),
            },
            Command::Load(path) => match story.load(&path).await {
                Ok(()) => {
                    println!("[LOADED] Story loaded from {path}");
                    print_status(&story);
                }
                Err(e) => println!("[ERROR] Load failed: {e}"),
            },
            Command::Stop => match story.stop() {
                Ok(final_story) => {
                    println!("[THE END] {}'s story", final_story.author);
                    if final_story.is_empty() {
                        println!("(nothing was written)");
                    } else {
                        for para in final_story.segments.iter() {
                            println!("{para}");
                            println!();
                        }
                    }
                    println!("Type #reset to start again or #quit to exit.");
                }
                Err(e) => println!("[ERROR] {e}"),
            },
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => {
                println!("[HELP]");
                println!("{HELP}");
            }
        }
        stdout.flush().ok();
    }

    Ok(())
}

async fn send_directive(story: &mut HeadlessStory, kind: DirectiveKind, value: &str) {
    let mut stdout = io::stdout();
    print!("[PROCESSING]");
    stdout.flush().ok();

    let result = story.send(kind, value).await;

    // Clear the processing indicator
    print!("\r            \r");
    stdout.flush().ok();

    match result {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                println!("[WARNING] {warning}");
            }
            print_block("[STORY]", &outcome.segment);
        }
        Err(SessionError::Turn(e)) if e.is_retryable() => {
            println!("[ERROR] {e}");
            println!("The story is unchanged; send the same line again to retry.");
        }
        Err(e) => println!("[ERROR] {e}"),
    }
}

/// What a streamed greeting managed to put on screen.
#[derive(Debug, PartialEq)]
enum Greeting {
    /// Some text was shown, possibly cut short by `error`.
    Shown { error: Option<String> },
    /// Nothing was shown, so the greeting can be produced another way.
    NothingShown { error: String },
}

/// Stream the narrator's greeting straight to stdout.
async fn stream_introduction(
    name: &str,
    config: &SessionConfig,
    conversation: ConversationId,
) -> Greeting {
    let stream = match open_introduction(name, config).await {
        Ok(stream) => stream,
        Err(e) => {
            return Greeting::NothingShown {
                error: e.to_string(),
            }
        }
    };
    tracing::debug!(%conversation, "streaming introduction");

    let mut stdout = io::stdout();
    match relay_greeting(stream, &mut stdout).await {
        Ok(greeting) => greeting,
        // stdout is unusable, so a fallback greeting could not be shown either
        Err(e) => Greeting::Shown {
            error: Some(e.to_string()),
        },
    }
}

async fn open_introduction(
    name: &str,
    config: &SessionConfig,
) -> Result<impl Stream<Item = Result<StreamEvent, gemini::Error>> + Unpin, gemini::Error> {
    let mut client = Gemini::from_env()?;
    if let Some(ref model) = config.model {
        client = client.with_model(model);
    }
    let model = GeminiModel::new(client).with_settings(GenerationSettings {
        model: None,
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    });

    model
        .client()
        .stream(model.request_for(&introduction_prompt(name)))
        .await
}

/// Copy text deltas to `out` under a `[NARRATOR]` tag.
///
/// The tag is written with the first non-empty delta, so a stream that fails
/// before producing text leaves `out` untouched.
async fn relay_greeting<S, W>(mut stream: S, out: &mut W) -> io::Result<Greeting>
where
    S: Stream<Item = Result<StreamEvent, gemini::Error>> + Unpin,
    W: Write,
{
    let mut shown = false;
    let mut error = None;

    while let Some(event) = stream.next().await {
        match event {
            Ok(StreamEvent::TextDelta { text }) => {
                if text.is_empty() {
                    continue;
                }
                if !shown {
                    writeln!(out, "[NARRATOR]")?;
                    shown = true;
                }
                write!(out, "{text}")?;
                out.flush()?;
            }
            Ok(StreamEvent::Error { message }) => {
                error = Some(message);
                break;
            }
            Ok(StreamEvent::Finished { .. } | StreamEvent::Usage(_)) => {}
            Err(e) => {
                error = Some(e.to_string());
                break;
            }
        }
    }

    if !shown {
        return Ok(Greeting::NothingShown {
            error: error.unwrap_or_else(|| "introduction was empty".to_string()),
        });
    }

    writeln!(out)?;
    if let Some(ref message) = error {
        writeln!(out, "[ERROR] {message}")?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(Greeting::Shown { error })
}

fn print_block(tag: &str, text: &str) {
    println!("{tag}");
    for para in text.split("\n\n") {
        println!("{para}");
    }
    println!();
}

fn print_status(story: &HeadlessStory) {
    let session = story.session();
    println!("[STATUS]");
    println!("  Author: {}", session.identity().unwrap_or("(unknown)"));
    println!("  State: {:?}", session.state());
    println!("  Segments: {}", session.history().len());
    println!(
        "  Genre: {}",
        story.genre().map(|g| g.label()).unwrap_or("none")
    );
    println!("  Tone: {}", story.tone().map(|t| t.label()).unwrap_or("none"));
    println!("  Character: {}", story.character().unwrap_or("none"));
    println!("  Setting: {}", story.setting().unwrap_or("none"));
}

/// Parse story configuration from command line arguments.
pub fn parse_config_from_args(args: &[String]) -> HeadlessConfig {
    let mut config = HeadlessConfig::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--name" => {
                if let Some(name) = args.get(i + 1) {
                    config = config.with_name(name.as_str());
                    i += 1;
                }
            }
            "--genre" => {
                if let Some(genre) = args.get(i + 1) {
                    match genre.parse() {
                        Ok(genre) => config = config.with_genre(genre),
                        Err(e) => eprintln!("Ignoring --genre: {e}"),
                    }
                    i += 1;
                }
            }
            "--tone" => {
                if let Some(tone) = args.get(i + 1) {
                    match tone.parse() {
                        Ok(tone) => config = config.with_tone(tone),
                        Err(e) => eprintln!("Ignoring --tone: {e}"),
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    config
}
