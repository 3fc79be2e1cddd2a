//! Last-observed streamer snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::twitch::types::{TwitchChannel, TwitchStream, TwitchUser};

/// Canonical form of a login name: trimmed, lowercase.
///
/// Used as the one true identity for lookups and storage so case variation in
/// the config or upstream responses never produces duplicate entries.
pub fn canonical_login(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Point-in-time observation of one streamer.
///
/// Immutable value record; a new snapshot fully replaces the old one. When
/// `is_live` is false, `started_at` and `thumbnail_url` are `None` while
/// title/category may still carry the last-known values from channel metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamerState {
    pub user_id: String,
    /// Canonical lowercase login.
    pub username: String,
    pub display_name: String,
    pub profile_image_url: String,
    pub is_live: bool,
    pub title: String,
    pub category_id: String,
    pub category_name: String,
    /// Stream start time, present only while live.
    pub started_at: Option<DateTime<Utc>>,
    /// Preview image template URL, present only while live.
    pub thumbnail_url: Option<String>,
    pub viewer_count: u64,
}

impl StreamerState {
    /// Build a snapshot with precedence live data > channel fallback > empty defaults.
    pub fn from_sources(
        user: &TwitchUser,
        stream: Option<&TwitchStream>,
        channel: Option<&TwitchChannel>,
    ) -> Self {
        match stream {
            Some(stream) => Self {
                user_id: user.id.clone(),
                username: user.login.clone(),
                display_name: user.display_name.clone(),
                profile_image_url: user.profile_image_url.clone(),
                is_live: true,
                title: stream.title.clone(),
                category_id: stream.game_id.clone(),
                category_name: stream.game_name.clone(),
                started_at: Some(stream.started_at),
                thumbnail_url: Some(stream.thumbnail_url.clone()),
                viewer_count: stream.viewer_count,
            },
            None => Self {
                user_id: user.id.clone(),
                username: user.login.clone(),
                display_name: user.display_name.clone(),
                profile_image_url: user.profile_image_url.clone(),
                is_live: false,
                title: channel.map(|c| c.title.clone()).unwrap_or_default(),
                category_id: channel.map(|c| c.game_id.clone()).unwrap_or_default(),
                category_name: channel.map(|c| c.game_name.clone()).unwrap_or_default(),
                started_at: None,
                thumbnail_url: None,
                viewer_count: 0,
            },
        }
    }
}

/// In-memory map of last-observed snapshots, keyed by canonical login.
///
/// Single writer (the poll cycle), no locking.
#[derive(Debug, Default)]
pub struct StateStore {
    states: HashMap<String, StreamerState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<&StreamerState> {
        self.states.get(&canonical_login(username))
    }

    pub fn set(&mut self, username: &str, state: StreamerState) {
        self.states.insert(canonical_login(username), state);
    }

    pub fn has(&self, username: &str) -> bool {
        self.states.contains_key(&canonical_login(username))
    }

    /// Copy of the full mapping.
    pub fn snapshot_all(&self) -> HashMap<String, StreamerState> {
        self.states.clone()
    }
}
