use async_trait::async_trait;
use thiserror::Error;

use super::fetcher::{FeedFetcher, FetchError};
use super::parser::{parse_feed, Feed, ParseError};

/// Why a poll produced no feed.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// Something the watcher can ask for the current state of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed once.
    async fn latest(&self) -> Result<Feed, PollError>;
}

/// The upload feed of one YouTube channel.
#[derive(Debug, Clone)]
pub struct YoutubeFeed {
    fetcher: FeedFetcher,
    channel_id: String,
}

impl YoutubeFeed {
    pub fn new(fetcher: FeedFetcher, channel_id: impl Into<String>) -> Self {
        Self {
            fetcher,
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl FeedSource for YoutubeFeed {
    async fn latest(&self) -> Result<Feed, PollError> {
        let bytes = self.fetcher.fetch(&self.channel_id).await?;
        let feed = parse_feed(&bytes)?;

        if let Some(found) = feed.channel_id.as_deref() {
            if found != self.channel_id {
                tracing::warn!(
                    expected = %self.channel_id,
                    found = %found,
                    "Feed reports a different channel id"
                );
            }
        }

        Ok(feed)
    }
}
