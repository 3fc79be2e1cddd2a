//! Configuration loading and validation.
//!
//! The config lives in a single JSON file (`config.json` by default) holding
//! Twitch credentials, the polling interval, and the watched streamers with
//! their notification flags and Discord webhook targets.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Discord webhook URLs must start with this prefix.
pub const WEBHOOK_URL_PREFIX: &str = "https://discord.com/api/webhooks/";

/// Minimum allowed polling interval in seconds.
const MIN_INTERVAL_SECONDS: u64 = 10;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Twitch API credentials.
    pub twitch: TwitchCredentials,
    /// Polling settings.
    pub polling: PollingConfig,
    /// Watched streamers.
    pub streamers: Vec<StreamerConfig>,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Twitch app credentials for the client-credentials OAuth flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between poll cycles.
    pub interval_seconds: u64,
}

/// Per-streamer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfig {
    /// Twitch login name; matched case-insensitively.
    pub username: String,
    /// Which change kinds to notify about.
    pub notifications: NotificationSettings,
    /// Discord webhook URLs to deliver to.
    pub webhooks: Vec<String>,
}

/// Per-kind notification flags.
///
/// The composite title-and-category change is notifiable when either of its
/// constituent flags is enabled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub went_live: bool,
    pub went_offline: bool,
    pub title_change: bool,
    pub category_change: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Log threshold, fixed at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Load and validate the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "config file not found: {} (copy config.example.json and fill it in)",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.twitch.client_id.is_empty() || self.twitch.client_secret.is_empty() {
            return Err(Error::config(
                "twitch.client_id and twitch.client_secret are required",
            ));
        }

        if self.polling.interval_seconds < MIN_INTERVAL_SECONDS {
            return Err(Error::config(format!(
                "polling.interval_seconds must be at least {}",
                MIN_INTERVAL_SECONDS
            )));
        }

        if self.streamers.is_empty() {
            return Err(Error::config("at least one streamer must be configured"));
        }

        for streamer in &self.streamers {
            if streamer.username.trim().is_empty() {
                return Err(Error::config("streamer.username is required"));
            }
            if streamer.webhooks.is_empty() {
                return Err(Error::config(format!(
                    "{}: at least one webhook URL is required",
                    streamer.username
                )));
            }
            for webhook in &streamer.webhooks {
                if !webhook.starts_with(WEBHOOK_URL_PREFIX) {
                    return Err(Error::config(format!(
                        "{}: invalid webhook URL: {}",
                        streamer.username, webhook
                    )));
                }
            }
        }

        Ok(())
    }

    /// The configured poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }
}
