//! Discord webhook delivery with parallel fan-out.
//!
//! One event is sent to every configured target concurrently; each target's
//! outcome is captured independently so a failing endpoint never affects the
//! others. Failed deliveries are logged and lost, never retried.

use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{Error, Result};

use super::embed::DiscordEmbed;

/// Webhook request body.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<DiscordEmbed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Sends embeds to Discord webhook endpoints.
#[derive(Debug, Clone, Default)]
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Deliver one payload to a single target.
    pub async fn send(&self, url: &str, payload: &WebhookPayload) -> Result<()> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Webhook {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %redact(url), "Webhook delivered");
        Ok(())
    }

    /// Fan one embed out to every target concurrently.
    ///
    /// Per-target failures are logged individually and isolated; this never
    /// fails as a whole.
    pub async fn send_to_all(
        &self,
        urls: &[String],
        embed: &DiscordEmbed,
        username: &str,
        avatar_url: &str,
    ) {
        let payload = WebhookPayload {
            embeds: vec![embed.clone()],
            username: Some(username.to_string()),
            avatar_url: Some(avatar_url.to_string()),
        };

        let deliveries = urls.iter().map(|url| self.send(url, &payload));
        let results = join_all(deliveries).await;

        for (index, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                warn!(
                    target = index + 1,
                    total = urls.len(),
                    error = %e,
                    "Webhook delivery failed"
                );
            }
        }
    }
}

/// Webhook URLs embed a secret token; log only a prefix.
fn redact(url: &str) -> &str {
    url.get(..50).unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serialization() {
        let payload = WebhookPayload {
            embeds: vec![DiscordEmbed {
                title: "Stream started".to_string(),
                color: 0x9146ff,
                ..Default::default()
            }],
            username: Some("FooBar".to_string()),
            avatar_url: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["embeds"][0]["title"], "Stream started");
        assert_eq!(json["username"], "FooBar");
        assert!(json.get("avatar_url").is_none());
    }

    #[test]
    fn test_redact_truncates_long_urls() {
        let url = format!("https://discord.com/api/webhooks/{}", "x".repeat(100));
        assert_eq!(redact(&url).len(), 50);
        assert_eq!(redact("short"), "short");
    }
}
