//! Outbound notifications.
//!
//! The watcher only needs "send this text to that channel", expressed by the
//! [`Notifier`] trait. [`DiscordNotifier`] implements it over the Discord REST API.

mod discord;

use async_trait::async_trait;
use thiserror::Error;

pub use discord::{BotUser, DiscordNotifier, DEFAULT_DISCORD_API_BASE};

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Nothing to send; no request is made.
    #[error("Refusing to send an empty message")]
    EmptyMessage,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// The bot token was rejected (HTTP 401).
    #[error("Bot token rejected by Discord")]
    Unauthorized,
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
}

/// A sink for plain-text messages addressed to a channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel_id: &str, message: &str) -> Result<(), NotifyError>;
}
