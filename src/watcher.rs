//! The detection loop.
//!
//! A [`Watcher`] seeds its [`SeenSet`] from the feed once at startup, then on
//! every tick fetches the feed again and announces the first entry it has not
//! seen before. At most one entry is announced per tick; a backlog drains one
//! entry per interval.
//!
//! Polling errors never stop the loop. Each tick reports what happened as a
//! [`TickOutcome`] so callers and tests can observe swallowed failures.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use crate::feed::{Entry, Feed, FeedSource, PollError};
use crate::notify::{Notifier, NotifyError};

/// Pause between ticks when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Ids of entries already announced or suppressed at bootstrap.
///
/// Membership only grows: nothing is ever removed.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Mark every entry of `feed` as seen. Returns how many ids were new.
    pub fn seed(&mut self, feed: &Feed) -> usize {
        feed.entries
            .iter()
            .filter(|entry| self.insert(entry.id.as_str()))
            .count()
    }

    /// Find the first entry, in feed order, whose id is unseen; mark it seen
    /// and return it. Later unseen entries are left for a future call.
    pub fn claim_first_unseen<'a>(&mut self, entries: &'a [Entry]) -> Option<&'a Entry> {
        let entry = entries.iter().find(|e| !self.contains(&e.id))?;
        self.insert(entry.id.as_str());
        Some(entry)
    }
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The feed was read and held nothing new.
    Quiet,
    /// A new entry was found and marked seen. `delivery` is the notifier's
    /// verdict; a failed delivery does not unmark the entry.
    Detected {
        entry: Entry,
        delivery: Result<(), NotifyError>,
    },
    /// The feed could not be fetched or parsed; nothing changed.
    Failed(PollError),
}

impl TickOutcome {
    /// The entry this tick detected, if any.
    pub fn detected(&self) -> Option<&Entry> {
        match self {
            TickOutcome::Detected { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

/// Polls one feed and reports new entries to one channel.
pub struct Watcher<S, N> {
    source: S,
    notifier: N,
    target_channel: String,
    seen: SeenSet,
    interval: Duration,
}

impl<S: FeedSource, N: Notifier> Watcher<S, N> {
    /// Read the feed once and treat everything in it as already seen.
    ///
    /// # Errors
    ///
    /// Any fetch or parse failure is returned as-is. There is no retry at
    /// this stage: a watcher that cannot read its feed at startup is not
    /// started.
    pub async fn bootstrap(
        source: S,
        notifier: N,
        target_channel: impl Into<String>,
        interval: Duration,
    ) -> Result<Self, PollError> {
        let feed = source.latest().await?;

        let mut seen = SeenSet::new();
        let seeded = seen.seed(&feed);
        tracing::info!(
            seeded = seeded,
            channel = feed.channel_id.as_deref().unwrap_or("unknown"),
            "Treating all current videos as seen"
        );

        Ok(Self {
            source,
            notifier,
            target_channel: target_channel.into(),
            seen,
            interval,
        })
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the first unseen entry of `feed` as seen and return a copy of it.
    pub fn detect_new(&mut self, feed: &Feed) -> Option<Entry> {
        self.seen.claim_first_unseen(&feed.entries).cloned()
    }

    /// Run one poll: fetch, diff, and notify for at most one entry.
    pub async fn tick(&mut self) -> TickOutcome {
        tracing::info!("Checking for new videos");

        let feed = match self.source.latest().await {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(error = %e, "Error checking for new video");
                return TickOutcome::Failed(e);
            }
        };

        let Some(entry) = self.detect_new(&feed) else {
            return TickOutcome::Quiet;
        };

        tracing::info!(entry_id = %entry.id, title = %entry.title, "Found a new video");

        let delivery = if entry.link.is_empty() {
            Err(NotifyError::EmptyMessage)
        } else {
            self.notifier.send(&self.target_channel, &entry.link).await
        };

        if let Err(e) = &delivery {
            tracing::warn!(
                entry_id = %entry.id,
                channel_id = %self.target_channel,
                error = %e,
                "Failed to deliver notification"
            );
        }

        TickOutcome::Detected { entry, delivery }
    }

    /// Tick, sleep for the interval, and repeat until `shutdown` resolves.
    ///
    /// A pending tick or sleep is abandoned as soon as `shutdown` completes.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let interval = self.interval;
            tokio::select! {
                _ = &mut shutdown => break,
                _ = async {
                    self.tick().await;
                    tokio::time::sleep(interval).await;
                } => {}
            }
        }

        tracing::info!(seen = self.seen.len(), "Shutdown requested, watcher stopped");
    }
}
