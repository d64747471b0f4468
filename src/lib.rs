//! Watches a YouTube channel's upload feed and posts each new video link to a
//! Discord channel.
//!
//! ```text
//! Watcher ──latest()──► YoutubeFeed ──► FeedFetcher ─► parse_feed
//!    │                                                     │
//!    ◄──────────────────────── Feed ───────────────────────┘
//!    │ first unseen entry
//!    └──send(channel, link)──► DiscordNotifier
//! ```

pub mod config;
pub mod feed;
pub mod notify;
pub mod watcher;

pub use config::{Config, ConfigError, Tuning};
pub use watcher::{SeenSet, TickOutcome, Watcher};
