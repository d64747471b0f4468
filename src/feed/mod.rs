//! Channel feed fetching and parsing.
//!
//! - [`parser`] - Atom/RSS decoding into [`Feed`] / [`Entry`] using the `feed-rs` crate
//! - [`fetcher`] - single-attempt HTTP download with timeout and size limit
//! - [`source`] - the [`FeedSource`] seam the watcher polls
//!
//! # Example
//!
//! ```ignore
//! use tubewatch::feed::{FeedFetcher, FeedSource, YoutubeFeed};
//!
//! let fetcher = FeedFetcher::new(client, DEFAULT_FEED_BASE_URL, timeout, max_bytes)?;
//! let feed = YoutubeFeed::new(fetcher, "UCabc123").latest().await?;
//! ```

mod fetcher;
mod parser;
mod source;

pub use fetcher::{FeedFetcher, FetchError};
pub use parser::{parse_feed, Entry, Feed, ParseError};
pub use source::{FeedSource, PollError, YoutubeFeed};
