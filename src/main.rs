use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use tubewatch::config::{Config, Tuning};
use tubewatch::feed::{FeedFetcher, YoutubeFeed};
use tubewatch::notify::DiscordNotifier;
use tubewatch::watcher::Watcher;

#[derive(Parser, Debug)]
#[command(
    name = "tubewatch",
    about = "Post new uploads of a YouTube channel to a Discord channel",
    after_help = "Reads DISCORD_TOKEN, DISCORD_CHANNEL_ID and YOUTUBE_CHANNEL_ID from the environment."
)]
struct Args {
    /// Optional TOML file with polling and endpoint settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds between polls (overrides the config file)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn run(args: Args) -> Result<()> {
    let mut tuning = match &args.config {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => Tuning::default(),
    };
    if let Some(secs) = args.interval {
        tuning.poll_interval_secs = secs;
    }

    let config = Config::from_env(tuning).context("Invalid environment configuration")?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let client = reqwest::Client::builder()
        .user_agent(concat!("tubewatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let notifier = DiscordNotifier::new(
        client.clone(),
        config.discord_token,
        &config.tuning.discord_api_base,
        config.tuning.request_timeout(),
    );
    let bot = notifier
        .verify()
        .await
        .context("Discord rejected the bot credentials")?;
    tracing::info!(bot = %bot.username, "Connected to Discord");

    let fetcher = FeedFetcher::new(
        client,
        &config.tuning.feed_base_url,
        config.tuning.request_timeout(),
        config.tuning.max_feed_bytes,
    )
    .context("Invalid feed base URL")?;
    let source = YoutubeFeed::new(fetcher, config.youtube_channel_id);

    let mut watcher = Watcher::bootstrap(
        source,
        notifier,
        config.discord_channel_id,
        config.tuning.poll_interval(),
    )
    .await
    .context("Failed to read the channel feed at startup")?;

    tracing::info!(
        interval_secs = watcher.interval().as_secs(),
        "Watching for new videos"
    );
    watcher.run(shutdown_signal()).await;

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_json);

    if let Err(e) = run(args).await {
        tracing::error!(error = %format!("{:#}", e), "Fatal startup error");
        std::process::exit(1);
    }
}
