//! End-to-end tests for the watch cycle: a real `YoutubeFeed` and
//! `DiscordNotifier` talking to a mock HTTP server.
//!
//! Each test starts its own `MockServer` that plays both the feed endpoint and
//! the Discord API.

use secrecy::SecretString;
use std::time::Duration;
use tubewatch::feed::{FeedFetcher, FetchError, PollError, YoutubeFeed};
use tubewatch::notify::{DiscordNotifier, NotifyError};
use tubewatch::watcher::{TickOutcome, Watcher, DEFAULT_POLL_INTERVAL};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHANNEL: &str = "UCtestchannel";
const DISCORD_CHANNEL: &str = "987654321";

fn atom_feed(video_ids: &[&str]) -> String {
    let entries: String = video_ids
        .iter()
        .map(|id| {
            format!(
                r#"
 <entry>
  <id>yt:video:{id}</id>
  <yt:videoId>{id}</yt:videoId>
  <yt:channelId>{CHANNEL}</yt:channelId>
  <title>Video {id}</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v={id}"/>
  <published>2024-05-01T10:00:00+00:00</published>
  <updated>2024-05-01T10:00:00+00:00</updated>
 </entry>"#
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <id>yt:channel:{CHANNEL}</id>
 <yt:channelId>{CHANNEL}</yt:channelId>
 <title>Test Channel</title>{entries}
</feed>"#
    )
}

async fn mount_feed_once(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .and(query_param("channel_id", CHANNEL))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

fn components(server: &MockServer) -> (YoutubeFeed, DiscordNotifier) {
    let client = reqwest::Client::new();
    let fetcher = FeedFetcher::new(
        client.clone(),
        &format!("{}/feeds/videos.xml", server.uri()),
        Duration::from_secs(5),
        1024 * 1024,
    )
    .unwrap();
    let notifier = DiscordNotifier::new(
        client,
        SecretString::from("integration-token".to_string()),
        &format!("{}/api/v10", server.uri()),
        Duration::from_secs(5),
    );
    (YoutubeFeed::new(fetcher, CHANNEL), notifier)
}

async fn bootstrapped(server: &MockServer) -> Watcher<YoutubeFeed, DiscordNotifier> {
    let (source, notifier) = components(server);
    Watcher::bootstrap(source, notifier, DISCORD_CHANNEL, DEFAULT_POLL_INTERVAL)
        .await
        .unwrap()
}

// ============================================================================
// Detection
// ============================================================================

#[tokio::test]
async fn test_new_upload_is_posted_once() {
    let server = MockServer::start().await;
    mount_feed_once(&server, atom_feed(&["v3", "v2", "v1"])).await;
    mount_feed_once(&server, atom_feed(&["v4", "v3", "v2", "v1"])).await;
    mount_feed_once(&server, atom_feed(&["v4", "v3", "v2", "v1"])).await;

    Mock::given(method("POST"))
        .and(path(format!("/api/v10/channels/{}/messages", DISCORD_CHANNEL)))
        .and(header("Authorization", "Bot integration-token"))
        .and(body_json(serde_json::json!({
            "content": "https://www.youtube.com/watch?v=v4"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut watcher = bootstrapped(&server).await;
    assert_eq!(watcher.seen().len(), 3);

    let outcome = watcher.tick().await;
    match &outcome {
        TickOutcome::Detected { entry, delivery } => {
            assert_eq!(entry.id, "yt:video:v4");
            assert_eq!(entry.title, "Video v4");
            assert!(delivery.is_ok(), "delivery failed: {:?}", delivery);
        }
        other => panic!("Expected Detected, got {:?}", other),
    }
    for id in ["v1", "v2", "v3", "v4"] {
        assert!(watcher.seen().contains(&format!("yt:video:{}", id)));
    }

    // Same feed again: nothing new, no second POST
    assert!(matches!(watcher.tick().await, TickOutcome::Quiet));
}

#[tokio::test]
async fn test_startup_videos_are_not_posted() {
    let server = MockServer::start().await;
    mount_feed_once(&server, atom_feed(&["a", "b"])).await;
    mount_feed_once(&server, atom_feed(&["a", "b"])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut watcher = bootstrapped(&server).await;
    assert!(matches!(watcher.tick().await, TickOutcome::Quiet));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_bootstrap_fails_on_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (source, notifier) = components(&server);
    let result = Watcher::bootstrap(source, notifier, DISCORD_CHANNEL, DEFAULT_POLL_INTERVAL).await;
    assert!(matches!(
        result,
        Err(PollError::Fetch(FetchError::HttpStatus(404)))
    ));
}

#[tokio::test]
async fn test_bootstrap_fails_on_malformed_feed() {
    let server = MockServer::start().await;
    mount_feed_once(&server, "<html>not a feed</html>".to_string()).await;

    let (source, notifier) = components(&server);
    let result = Watcher::bootstrap(source, notifier, DISCORD_CHANNEL, DEFAULT_POLL_INTERVAL).await;
    assert!(matches!(result, Err(PollError::Parse(_))));
}

#[tokio::test]
async fn test_malformed_feed_during_polling_is_skipped() {
    let server = MockServer::start().await;
    mount_feed_once(&server, atom_feed(&["a"])).await;
    mount_feed_once(&server, "<not valid xml".to_string()).await;
    mount_feed_once(&server, atom_feed(&["b", "a"])).await;

    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({
            "content": "https://www.youtube.com/watch?v=b"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut watcher = bootstrapped(&server).await;

    let failed = watcher.tick().await;
    assert!(matches!(failed, TickOutcome::Failed(PollError::Parse(_))));
    assert_eq!(watcher.seen().len(), 1);

    let recovered = watcher.tick().await;
    assert_eq!(
        recovered.detected().map(|e| e.id.as_str()),
        Some("yt:video:b")
    );
}

#[tokio::test]
async fn test_delivery_failure_does_not_repost() {
    let server = MockServer::start().await;
    mount_feed_once(&server, atom_feed(&["a"])).await;
    mount_feed_once(&server, atom_feed(&["b", "a"])).await;
    mount_feed_once(&server, atom_feed(&["b", "a"])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut watcher = bootstrapped(&server).await;

    match watcher.tick().await {
        TickOutcome::Detected { entry, delivery } => {
            assert_eq!(entry.id, "yt:video:b");
            assert!(matches!(delivery, Err(NotifyError::HttpStatus(500))));
        }
        other => panic!("Expected Detected, got {:?}", other),
    }

    assert!(matches!(watcher.tick().await, TickOutcome::Quiet));
}
