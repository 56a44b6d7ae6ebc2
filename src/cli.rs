use clap::{Parser, Subcommand};

use crate::generator::DEFAULT_GEMINI_MODEL;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = None,
    name = "slidepipe"
)]
pub struct Cli {
    /// Port to run the control server on
    #[arg(short = 'p', long, default_value_t = 3030)]
    pub port: u16,

    /// Gemini API key, used for deviation checks and slide content generation.
    /// The enhancer refuses to start without one.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: Option<String>,

    /// Gemini model to use
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Pexels API key for stock photo lookups. Without it photo lookups are
    /// skipped and slides fall back to icons or text only.
    #[arg(long, env = "PEXELS_API_KEY")]
    pub pexels_api_key: Option<String>,

    /// Seconds between deviation checks
    #[arg(long, default_value_t = 8)]
    pub check_interval: u64,

    /// Deck document to select at startup
    #[arg(short = 'd', long)]
    pub deck: Option<String>,

    /// Start the auto enhancer immediately (requires --deck)
    #[arg(long, default_value_t = false)]
    pub auto_start: bool,

    /// Read transcript lines from stdin instead of waiting for POST /transcript.
    /// Each line counts as one utterance; useful for demos without a speech engine.
    #[arg(long, default_value_t = false)]
    pub stdin_transcript: bool,

    /// Keep topics the current slide already covers instead of suppressing them
    #[arg(long, default_value_t = false)]
    pub no_dedupe_topics: bool,

    /// Data directory. Default to $HOME/.slidepipe
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Enable debug logging for slidepipe modules
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a starter deck document and exit
    InitDeck {
        /// Where to write the deck
        path: String,

        /// Number of blank slides
        #[arg(short = 'n', long, default_value_t = 1)]
        slides: usize,
    },
}
