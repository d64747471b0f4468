//! Startup configuration.
//!
//! Credentials and channel ids come from the environment ([`Config`]).
//! Polling knobs come from an optional TOML file ([`Tuning`]); a missing file
//! yields `Tuning::default()`. Both are read once and never change afterwards.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::notify::DEFAULT_DISCORD_API_BASE;
use crate::watcher::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_FEED_BASE_URL: &str = "https://www.youtube.com/feeds/videos.xml";

pub const ENV_DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub const ENV_DISCORD_CHANNEL_ID: &str = "DISCORD_CHANNEL_ID";
pub const ENV_YOUTUBE_CHANNEL_ID: &str = "YOUTUBE_CHANNEL_ID";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Tuning (TOML)
// ============================================================================

/// Optional knobs, all with working defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Seconds to sleep between polls.
    pub poll_interval_secs: u64,

    /// Upper bound for any single HTTP request, in seconds.
    pub request_timeout_secs: u64,

    /// Feed endpoint; `?channel_id=<id>` is appended.
    pub feed_base_url: String,

    pub discord_api_base: String,

    /// Feed bodies larger than this are rejected.
    pub max_feed_bytes: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            request_timeout_secs: 30,
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            discord_api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            max_feed_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Tuning {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "poll_interval_secs",
        "request_timeout_secs",
        "feed_base_url",
        "discord_api_base",
        "max_feed_bytes",
    ];

    /// Load tuning from a TOML file.
    ///
    /// - Missing, empty or whitespace-only file → `Ok(Tuning::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    /// - Zero interval, timeout or size limit → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let tuning = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            poll_interval_secs = tuning.poll_interval_secs,
            "Loaded configuration"
        );
        Ok(tuning)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let tuning: Tuning = toml::from_str(content)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "poll_interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_feed_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Config (environment)
// ============================================================================

/// Everything the watcher needs to run.
///
/// Custom Debug impl masks `discord_token`.
pub struct Config {
    pub discord_token: SecretString,
    /// Destination text channel (Discord snowflake).
    pub discord_channel_id: String,
    /// Source channel whose uploads are watched.
    pub youtube_channel_id: String,
    pub tuning: Tuning,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("discord_channel_id", &self.discord_channel_id)
            .field("youtube_channel_id", &self.youtube_channel_id)
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl Config {
    /// Read credentials and channel ids from the process environment.
    pub fn from_env(tuning: Tuning) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), tuning)
    }

    /// Build a config from any key lookup.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingVar`] when a variable is unset or blank
    /// - [`ConfigError::Invalid`] when a channel id has the wrong shape
    pub fn from_lookup<F>(lookup: F, tuning: Tuning) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let token = required(ENV_DISCORD_TOKEN)?;
        let token = token
            .strip_prefix("Bot ")
            .map(|t| t.trim().to_string())
            .unwrap_or(token);
        if token.is_empty() {
            return Err(ConfigError::MissingVar(ENV_DISCORD_TOKEN));
        }

        let discord_channel_id = required(ENV_DISCORD_CHANNEL_ID)?;
        // Snowflake: plain digits that fit in a u64 (`parse` alone accepts a leading '+')
        if !discord_channel_id.chars().all(|c| c.is_ascii_digit())
            || discord_channel_id.parse::<u64>().is_err()
        {
            return Err(ConfigError::Invalid {
                key: ENV_DISCORD_CHANNEL_ID,
                reason: "expected a numeric channel id".to_string(),
            });
        }

        let youtube_channel_id = required(ENV_YOUTUBE_CHANNEL_ID)?;
        if !youtube_channel_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Invalid {
                key: ENV_YOUTUBE_CHANNEL_ID,
                reason: "only letters, digits, '-' and '_' are allowed".to_string(),
            });
        }

        Ok(Self {
            discord_token: SecretString::from(token),
            discord_channel_id,
            youtube_channel_id,
            tuning,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
