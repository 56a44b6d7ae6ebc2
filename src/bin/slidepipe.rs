use std::{fs, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::anyhow;
use chrono::Utc;
use clap::Parser;
use dirs::home_dir;
use slidepipe::{
    analyze_theme, AppState, Cli, Command, Enhancer, EnhancerConfig, FileDeck, GeminiGenerator,
    Server, StdinSource, StockVisualResolver, TranscriptSource,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn get_base_dir(custom_path: &Option<String>) -> anyhow::Result<PathBuf> {
    let default_path = home_dir()
        .ok_or_else(|| anyhow!("failed to get home directory"))?
        .join(".slidepipe");

    let base_dir = custom_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or(default_path);

    fs::create_dir_all(base_dir.join("data").join("visuals"))?;
    Ok(base_dir)
}

fn setup_logging(local_data_dir: &PathBuf, cli: &Cli) -> anyhow::Result<WorkerGuard> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("slidepipe")
        .filename_suffix("log")
        .max_log_files(5)
        .build(local_data_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("info".parse().unwrap())
        .add_directive("hyper=error".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    let env_filter = if cli.debug {
        env_filter.add_directive("slidepipe=debug".parse().unwrap())
    } else {
        env_filter
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::InitDeck { path, slides }) = &cli.command {
        FileDeck::create(path, *slides).await?;
        println!("wrote a starter deck with {} slide(s) to {}", slides, path);
        return Ok(());
    }

    let base_dir = get_base_dir(&cli.data_dir)?;
    let _log_guard = setup_logging(&base_dir, &cli)?;

    // no content generation without a credential; refuse to start at all
    let gemini_api_key = cli.gemini_api_key.clone().ok_or_else(|| {
        anyhow!("no Gemini API key configured; set GEMINI_API_KEY or pass --gemini-api-key")
    })?;

    let client = reqwest::Client::new();
    let generator = Arc::new(GeminiGenerator::new(
        client.clone(),
        gemini_api_key,
        cli.gemini_model.clone(),
    ));
    let visuals = Arc::new(StockVisualResolver::new(
        client,
        cli.pexels_api_key.clone(),
        base_dir.join("data").join("visuals"),
    ));

    let source: Option<Arc<dyn TranscriptSource>> = if cli.stdin_transcript {
        Some(Arc::new(StdinSource::new()))
    } else {
        None
    };

    let enhancer = Enhancer::new(
        generator,
        visuals,
        source,
        EnhancerConfig {
            check_interval: Duration::from_secs(cli.check_interval.max(1)),
            dedupe_topics: !cli.no_dedupe_topics,
        },
    );

    if let Some(deck_path) = &cli.deck {
        let deck = FileDeck::open(deck_path).await?;
        let style = analyze_theme(&deck.snapshot());
        info!(
            "deck style: titles {} {}pt, body {} {}pt",
            style.title_font_name,
            style.title_font_size,
            style.body_font_name,
            style.body_font_size
        );
        enhancer.attach_deck(Arc::new(deck), style, deck_path.clone())?;
        if cli.auto_start {
            enhancer.start()?;
        }
    } else if cli.auto_start {
        anyhow::bail!("--auto-start requires --deck");
    }

    let state = Arc::new(AppState {
        enhancer: enhancer.clone(),
        app_start_time: Utc::now(),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let server = Server::new(Arc::clone(&state), addr);

    tokio::select! {
        result = server.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            state.enhancer.stop().await;
        }
    }

    Ok(())
}
