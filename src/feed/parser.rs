use chrono::{DateTime, Utc};
use feed_rs::parser;
use thiserror::Error;

/// Prefix YouTube puts in front of the channel id in the feed-level `<id>`.
const CHANNEL_ID_PREFIX: &str = "yt:channel:";

#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not a feed `feed-rs` understands (bad XML, no feed root).
    #[error("Invalid feed document: {0}")]
    Malformed(#[from] parser::ParseFeedError),
}

/// A parsed channel feed. Entries keep document order, which for YouTube is
/// newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: Option<String>,
    pub channel_id: Option<String>,
    pub entries: Vec<Entry>,
}

/// One upload in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable identifier, e.g. `yt:video:dQw4w9WgXcQ`.
    pub id: String,
    pub title: String,
    /// Watch URL; empty when the entry carries no link at all.
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

/// Decode a feed document into a [`Feed`].
///
/// No partial recovery: a malformed document yields an error and no entries.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseError> {
    let feed = parser::parse(bytes)?;

    let channel_id = feed
        .id
        .trim()
        .strip_prefix(CHANNEL_ID_PREFIX)
        .filter(|id| !id.is_empty())
        .map(String::from);

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate"))
                .or_else(|| entry.links.first())
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();
            let published = entry.published.or(entry.updated);
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            // feed-rs fills in an id derived from link and title when <id> is absent
            let id = entry.id.trim().to_string();

            Entry {
                id,
                title,
                link,
                published,
            }
        })
        .collect();

    Ok(Feed {
        title: feed.title.map(|t| t.content),
        channel_id,
        entries,
    })
}
