mod analysis;
mod capture;
mod config;
mod error;
mod game;
mod monitoring;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use futures::Stream;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

use analysis::{reference_chance, wager, window_reports};
use capture::{CaptureFilter, CaptureRelay, InboundMessage, OutboundMessage, RetryPolicy};
use config::Config;
use game::ResultNormalizer;
use monitoring::SnapshotNotifier;
use store::{AggregateStore, FileHost, HostContext};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay captured messages into the result store
    Start {
        /// Newline-delimited message file (defaults to stdin)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Page the captures come from until a TAB_UPDATED says otherwise
        #[arg(long)]
        page_url: Option<String>,
    },
    /// Print stored statistics and rolling windows
    Stats {
        /// Reference win chance in percent (defaults to the latest result's)
        #[arg(long)]
        win_chance: Option<f64>,
    },
    /// Delete all stored results
    Clear,
    /// Initialize the storage location
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = config::load_config()?;

    // Stdout carries outbound messages, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.max_log_level()?)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting Watchful Window");

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Start { input, page_url }) => {
            run_relay(&config, input, page_url).await?;
        }
        Some(Commands::Stats { win_chance }) => {
            print_stats(&config, win_chance).await?;
        }
        Some(Commands::Clear) => {
            let store = open_store(&config, HostContext::new()).await?;
            store.clear().await?;
            store.close().await?;
            info!("All stored results cleared");
        }
        Some(Commands::Init) => {
            config::initialize_config(&config).await?;
        }
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

async fn open_store(config: &Config, context: HostContext) -> Result<AggregateStore<FileHost>> {
    let host = FileHost::new(&config.store_path)
        .with_context(|| format!("opening storage at {}", config.store_path.display()))?;
    let store = AggregateStore::open_with_cap(host, context, config.history_cap).await?;
    Ok(store)
}

async fn run_relay(config: &Config, input: Option<PathBuf>, page_url: Option<String>) -> Result<()> {
    let context = HostContext::new();
    let store = Arc::new(open_store(config, context.clone()).await?);

    let notifier = SnapshotNotifier::new(config.webhook_url.clone());
    let notifications = notifier.watch(store.subscribe());

    let (out_tx, mut out_rx) = mpsc::channel::<OutboundMessage>(100);
    let printer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to encode outbound message: {}", e),
            }
        }
    });

    let mut relay = CaptureRelay::new(
        ResultNormalizer::new(config.fallback_variant),
        store.clone(),
        CaptureFilter::new(config.site_origin.clone(), &config.game_keywords),
        context,
        out_tx,
    )
    .with_page_url(page_url);

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening input {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let policy = RetryPolicy::with_timeout(Duration::from_secs(config.win_chance_timeout_secs));
    let stats = relay.run(Box::pin(inbound_messages(reader)), policy).await?;

    // Dropping the relay closes the outbound channel
    drop(relay);
    store.close().await?;
    if let Err(e) = printer.await {
        error!("Outbound writer failed: {}", e);
    }
    // Last sender gone, so the notifier drains and stops
    drop(store);
    if let Err(e) = notifications.await {
        error!("Notifier task failed: {}", e);
    }

    info!(
        "Relay finished: {} captures, {} stored, {} filtered, {} unparsed, {} failed",
        stats.received, stats.stored, stats.filtered, stats.unparsed, stats.failed
    );
    Ok(())
}

/// Decodes one message per line; blank and unrecognised lines are skipped.
fn inbound_messages(
    reader: Box<dyn AsyncRead + Unpin + Send>,
) -> impl Stream<Item = InboundMessage> {
    let lines = BufReader::new(reader).lines();
    futures::stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<InboundMessage>(&line) {
                        Ok(message) => return Some((message, lines)),
                        Err(e) => debug!("Skipping unrecognised message: {}", e),
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    return None;
                }
            }
        }
    })
}

async fn print_stats(config: &Config, win_chance: Option<f64>) -> Result<()> {
    let store = open_store(config, HostContext::new()).await?;
    let snapshot = store.read_snapshot().await?;
    store.close().await?;

    println!(
        "Total games: {}  Wins / Losses: {} / {}  Win rate: {:.2}%",
        snapshot.total_games, snapshot.wins, snapshot.losses, snapshot.win_rate
    );

    let chance = reference_chance(&snapshot, win_chance);
    println!("Reference chance: {:.2}%", chance);

    for report in window_reports(&snapshot, chance) {
        println!(
            "  last {:>2}: {:>5.1}% ({}/{}) {:?}",
            report.window_size, report.win_rate, report.wins, report.filled, report.deviation
        );
    }

    if let Some(latest) = snapshot.latest() {
        let view = wager::derive(latest);
        println!(
            "Latest: {:?} {} profit {:.2} bet {:.2} target {}",
            latest.outcome,
            latest.game_type,
            view.profit,
            view.bet_amount,
            view.target_multiplier
                .map(|t| format!("{:.2}x", t))
                .unwrap_or_else(|| "-".to_string())
        );
    } else {
        println!("No games recorded yet.");
    }

    Ok(())
}
