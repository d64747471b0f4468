use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while downloading a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configured feed base URL does not parse.
    #[error("Invalid feed base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Downloads a channel feed over HTTP.
///
/// A fetch is a single attempt. The polling interval is the only retry, so
/// there is no backoff here.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    max_bytes: usize,
}

impl FeedFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidBaseUrl`] if `base_url` is not a valid URL.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            timeout,
            max_bytes,
        })
    }

    /// URL of the feed for `channel_id`: `<base>?channel_id=<id>`.
    pub fn feed_url(&self, channel_id: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("channel_id", channel_id);
        url
    }

    /// Fetch the raw feed body for `channel_id`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] - no complete response within the timeout
    /// - [`FetchError::Network`] - connection, TLS or body read failure
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::ResponseTooLarge`] - body exceeded the size limit
    /// - [`FetchError::IncompleteResponse`] - body shorter than Content-Length
    pub async fn fetch(&self, channel_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.feed_url(channel_id);

        // The timeout covers the body read too, a stalled stream must not hang the loop
        tokio::time::timeout(self.timeout, async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(FetchError::Network)?;

            if !response.status().is_success() {
                tracing::debug!(url = %url, status = %response.status(), "Feed request rejected");
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, self.max_bytes).await
        })
        .await
        .map_err(|_| FetchError::Timeout)?
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let short = expected_length.is_some_and(|expected| (bytes.len() as u64) < expected);
        let chunk = match chunk {
            Ok(chunk) => chunk,
            // Connection closed before Content-Length bytes arrived
            Err(_) if short => break,
            Err(e) => return Err(FetchError::Network(e)),
        };
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
