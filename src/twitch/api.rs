//! Helix API access.
//!
//! [`TwitchApi`] is the seam the poller talks through; [`HelixClient`] is the
//! production implementation with app-access-token management and batched
//! queries. All returned maps are keyed by canonical lowercase login.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Error, Result};

use super::types::{DataEnvelope, TokenResponse, TwitchChannel, TwitchStream, TwitchUser, TwitchVideo};

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const HELIX_BASE: &str = "https://api.twitch.tv/helix";

/// Helix accepts at most 100 values for a repeated query parameter.
const BATCH_LIMIT: usize = 100;

/// Tokens are refreshed this long before their reported expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upstream API surface consumed by the poller.
///
/// Absence of a login key in the streams map means the channel is not live.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// Resolve login names to users.
    async fn get_users(&self, logins: &[String]) -> Result<HashMap<String, TwitchUser>>;

    /// Fetch the live streams among the given logins.
    async fn get_streams(&self, logins: &[String]) -> Result<HashMap<String, TwitchStream>>;

    /// Fetch channel metadata (last-known title/category) by broadcaster id.
    async fn get_channels(&self, broadcaster_ids: &[String]) -> Result<HashMap<String, TwitchChannel>>;

    /// Fetch the most recent archive VOD for a user, if any.
    async fn get_latest_vod(&self, user_id: &str) -> Result<Option<TwitchVideo>>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Production Helix client using the client-credentials flow.
pub struct HelixClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl HelixClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::with_client(Client::new(), client_id, client_secret)
    }

    pub fn with_client(
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        }
    }

    /// Get a valid app access token, requesting a fresh one when the cached
    /// token is missing or within its expiry margin.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting new Twitch app access token");
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "token request failed: {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in);
        let cached = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        };
        *guard = Some(cached);
        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// GET a Helix endpoint and deserialize the response.
    ///
    /// A 401 invalidates the cached token and retries once, covering
    /// server-side revocation of an otherwise unexpired token.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            let token = self.access_token().await?;
            let response = self
                .client
                .get(format!("{}{}", HELIX_BASE, path))
                .header("Client-Id", &self.client_id)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                debug!("Helix returned 401, refreshing token and retrying");
                self.invalidate_token().await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(response.json().await?);
        }
    }
}

#[async_trait]
impl TwitchApi for HelixClient {
    async fn get_users(&self, logins: &[String]) -> Result<HashMap<String, TwitchUser>> {
        let mut users = HashMap::new();
        for chunk in logins.chunks(BATCH_LIMIT) {
            let query: Vec<(&str, &str)> = chunk.iter().map(|l| ("login", l.as_str())).collect();
            let envelope: DataEnvelope<TwitchUser> = self.get_json("/users", &query).await?;
            for user in envelope.data {
                users.insert(user.login.to_lowercase(), user);
            }
        }
        Ok(users)
    }

    async fn get_streams(&self, logins: &[String]) -> Result<HashMap<String, TwitchStream>> {
        let mut streams = HashMap::new();
        for chunk in logins.chunks(BATCH_LIMIT) {
            let query: Vec<(&str, &str)> =
                chunk.iter().map(|l| ("user_login", l.as_str())).collect();
            let envelope: DataEnvelope<TwitchStream> = self.get_json("/streams", &query).await?;
            for stream in envelope.data {
                streams.insert(stream.user_login.to_lowercase(), stream);
            }
        }
        Ok(streams)
    }

    async fn get_channels(
        &self,
        broadcaster_ids: &[String],
    ) -> Result<HashMap<String, TwitchChannel>> {
        let mut channels = HashMap::new();
        for chunk in broadcaster_ids.chunks(BATCH_LIMIT) {
            let query: Vec<(&str, &str)> = chunk
                .iter()
                .map(|id| ("broadcaster_id", id.as_str()))
                .collect();
            let envelope: DataEnvelope<TwitchChannel> = self.get_json("/channels", &query).await?;
            for channel in envelope.data {
                channels.insert(channel.broadcaster_login.to_lowercase(), channel);
            }
        }
        Ok(channels)
    }

    async fn get_latest_vod(&self, user_id: &str) -> Result<Option<TwitchVideo>> {
        let query = [("user_id", user_id), ("first", "1"), ("type", "archive")];
        let envelope: DataEnvelope<TwitchVideo> = self.get_json("/videos", &query).await?;
        Ok(envelope.data.into_iter().next())
    }
}
