//! StoryWeaver terminal application.
//!
//! A line-oriented interface for co-writing a story with an AI narrator.
//!
//! ```bash
//! cargo run -p storyweaver -- --name Ava --genre horror --tone dark
//! ```

mod headless;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Check for API key
    if std::env::var("GOOGLE_API_KEY").is_err() {
        eprintln!("Error: GOOGLE_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export GOOGLE_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let config = headless::parse_config_from_args(&args);
    headless::run_headless(config).await.map_err(|e| e.into())
}

fn print_help() {
    println!("StoryWeaver - interactive storytelling with an AI narrator");
    println!();
    println!("USAGE:");
    println!("  storyweaver [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --name <NAME>       Your name (asked for when omitted)");
    println!("  --genre <GENRE>     Starting genre");
    println!("  --tone <TONE>       Starting tone");
    println!();
    println!("GENRES:");
    println!("  horror, mystery, fantasy, sci-fi, romance, thriller");
    println!();
    println!("TONES:");
    println!("  dark, whimsical, suspenseful, melancholic, hopeful");
    println!();
    println!("ENVIRONMENT:");
    println!("  GOOGLE_API_KEY      Gemini API key (required)");
    println!("  RUST_LOG            Log filter, e.g. storyweaver_core=debug (default: warn)");
    println!();
    println!("EXAMPLES:");
    println!("  storyweaver");
    println!("  storyweaver --name Ava --genre mystery --tone suspenseful");
}
