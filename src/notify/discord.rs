use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use super::{Notifier, NotifyError};

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// The account behind a bot token, as returned by `GET /users/@me`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Posts messages to Discord text channels as a bot.
pub struct DiscordNotifier {
    client: reqwest::Client,
    token: SecretString,
    api_base: String,
    timeout: Duration,
}

impl std::fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl DiscordNotifier {
    pub fn new(
        client: reqwest::Client,
        token: SecretString,
        api_base: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Check the token against Discord and return the bot account.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Unauthorized`] when the token is invalid, otherwise the
    /// transport errors of [`Notifier::send`].
    pub async fn verify(&self) -> Result<BotUser, NotifyError> {
        let url = format!("{}/users/@me", self.api_base);
        self.with_timeout(async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, self.auth_header())
                .send()
                .await?;
            let response = check_status(response).await?;
            Ok(response.json::<BotUser>().await?)
        })
        .await
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token.expose_secret())
    }

    /// Bound a whole exchange, body read included, by the configured timeout.
    async fn with_timeout<T, F>(&self, exchange: F) -> Result<T, NotifyError>
    where
        F: Future<Output = Result<T, NotifyError>>,
    {
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| NotifyError::Timeout)?
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        reqwest::StatusCode::UNAUTHORIZED => Err(NotifyError::Unauthorized),
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .json::<RateLimitBody>()
                .await
                .map(|b| b.retry_after)
                .unwrap_or(0.0);
            Err(NotifyError::RateLimited { retry_after_secs })
        }
        _ => Err(NotifyError::HttpStatus(status.as_u16())),
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, channel_id: &str, message: &str) -> Result<(), NotifyError> {
        if message.trim().is_empty() {
            return Err(NotifyError::EmptyMessage);
        }

        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let payload = serde_json::json!({ "content": message });

        self.with_timeout(async {
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, self.auth_header())
                .json(&payload)
                .send()
                .await?;
            check_status(response).await?;
            Ok(())
        })
        .await?;

        tracing::debug!(channel_id = %channel_id, "Message delivered");
        Ok(())
    }
}
