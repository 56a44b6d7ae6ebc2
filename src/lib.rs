mod chart;
pub mod cli;
mod content;
mod coordinator;
mod core;
mod deck;
mod deviation;
mod generator;
mod server;
mod speech_buffer;
mod theme;
mod transcript;
mod visuals;

pub use chart::render_chart;
pub use cli::{Cli, Command};
pub use content::{ChartDataset, ChartKind, ChartSpec, SlideContent, SlideLayout, StyleGuide};
pub use coordinator::{ApplyOutcome, UpdateCoordinator};
pub use core::{
    Enhancer, EnhancerConfig, EnhancerStatus, StatusSnapshot, CHECK_INTERVAL,
    MIN_UTTERANCES_FOR_CHECK,
};
pub use deck::{
    compose_slide, Align, ApplyMode, Deck, DeckMutator, FileDeck, Frame, Shape, Slide,
    WATERMARK_TEXT,
};
pub use deviation::DeviationDetector;
pub use generator::{extract_json, ContentGenerator, GeminiGenerator, DEFAULT_GEMINI_MODEL};
pub use server::{create_router, AppState, HealthCheckResponse, Server};
pub use speech_buffer::{SpeechBuffer, SPEECH_BUFFER_CAPACITY};
pub use theme::analyze_theme;
pub use transcript::{StdinSource, TranscriptSource};
pub use visuals::{StockVisualResolver, VisualResolver};
