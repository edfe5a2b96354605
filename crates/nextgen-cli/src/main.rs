use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use nextgen_core::{ConversationStore, FileStore, KeyValueStore, MemoryStore, Settings};

mod app;
mod clipboard;
mod commands;

#[derive(Parser)]
#[command(name = "nextgen")]
#[command(about = "NextGen - leadership assistant for young people")]
#[command(version)]
struct Cli {
    /// Send a single message in a new conversation and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory where conversations are stored
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Milliseconds between revealed words of a reply
    #[arg(long)]
    reveal_ms: Option<u64>,

    /// Keep conversations in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => Settings::load_from(path),
        None => Settings::load(),
    };

    if let Some(ref dir) = cli.data_dir {
        settings.storage.data_dir = Some(dir.clone());
    }
    if let Some(ms) = cli.reveal_ms {
        settings.chat.reveal_interval_ms = ms;
    }

    let storage: Arc<dyn KeyValueStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(settings.storage.resolved_data_dir())?)
    };

    let store = ConversationStore::from_settings(storage, &settings)
        .with_notifier(Arc::new(app::TerminalNotifier));

    if let Err(e) = store.rehydrate().await {
        tracing::warn!("Starting with no conversations: {}", e);
    }

    if let Some(message) = cli.message {
        app::run_single_message(store, &message).await?;
    } else {
        app::run_repl(store).await?;
    }

    Ok(())
}
