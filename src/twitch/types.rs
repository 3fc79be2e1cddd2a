//! Typed responses for the Helix endpoints this service consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 client-credentials token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    pub token_type: String,
}

/// Common Helix response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Vec<T>,
}

/// A user from the Users endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitchUser {
    pub id: String,
    /// Login name, lowercase.
    pub login: String,
    pub display_name: String,
    pub profile_image_url: String,
}

/// A live stream from the Streams endpoint.
///
/// Only currently-live channels appear in this endpoint's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitchStream {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub game_id: String,
    pub game_name: String,
    pub title: String,
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
    /// Template URL with `{width}`/`{height}` placeholders.
    pub thumbnail_url: String,
}

/// Channel metadata from the Channels endpoint.
///
/// Available whether or not the channel is live; carries the last-known title
/// and category for offline channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitchChannel {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
    pub game_id: String,
    pub game_name: String,
    pub title: String,
}

/// A VOD from the Videos endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitchVideo {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Playback length, e.g. "3h2m1s".
    pub duration: String,
    /// Template URL with `%{width}`/`%{height}` placeholders.
    pub thumbnail_url: String,
}
