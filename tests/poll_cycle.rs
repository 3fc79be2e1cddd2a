//! End-to-end poll-cycle tests through a scripted fake Twitch API.
//!
//! Drives several consecutive cycles over a streamer's live/offline lifecycle
//! and asserts on the dispatched events and the committed snapshots.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use twitch_notifier::Result;
use twitch_notifier::config::{
    Config, LogConfig, NotificationSettings, PollingConfig, StreamerConfig, TwitchCredentials,
};
use twitch_notifier::monitor::{ChangeEvent, ChangeHandler, ChangeKind, Poller};
use twitch_notifier::twitch::TwitchApi;
use twitch_notifier::twitch::types::{TwitchChannel, TwitchStream, TwitchUser, TwitchVideo};

/// Fake upstream: a fixed user directory, a queue of per-cycle stream maps,
/// static channel metadata, and an optional VOD.
struct ScriptedApi {
    users: HashMap<String, TwitchUser>,
    streams: Mutex<VecDeque<HashMap<String, TwitchStream>>>,
    channels: Mutex<HashMap<String, TwitchChannel>>,
    vod: Option<TwitchVideo>,
}

#[async_trait]
impl TwitchApi for ScriptedApi {
    async fn get_users(&self, logins: &[String]) -> Result<HashMap<String, TwitchUser>> {
        Ok(logins
            .iter()
            .filter_map(|login| self.users.get(login).map(|u| (login.clone(), u.clone())))
            .collect())
    }

    async fn get_streams(&self, _logins: &[String]) -> Result<HashMap<String, TwitchStream>> {
        Ok(self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("script ran out of stream responses"))
    }

    async fn get_channels(
        &self,
        broadcaster_ids: &[String],
    ) -> Result<HashMap<String, TwitchChannel>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| broadcaster_ids.contains(&c.broadcaster_id))
            .map(|(login, c)| (login.clone(), c.clone()))
            .collect())
    }

    async fn get_latest_vod(&self, _user_id: &str) -> Result<Option<TwitchVideo>> {
        Ok(self.vod.clone())
    }
}

#[derive(Default)]
struct CollectingHandler {
    calls: Mutex<Vec<(String, Vec<ChangeEvent>)>>,
}

impl CollectingHandler {
    fn calls(&self) -> Vec<(String, Vec<ChangeEvent>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeHandler for CollectingHandler {
    async fn on_changes(&self, changes: &[ChangeEvent], streamer: &StreamerConfig) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((streamer.username.clone(), changes.to_vec()));
        Ok(())
    }
}

fn alpha_user() -> TwitchUser {
    TwitchUser {
        id: "100".to_string(),
        login: "alpha".to_string(),
        display_name: "Alpha".to_string(),
        profile_image_url: "https://example.com/alpha.png".to_string(),
    }
}

fn alpha_stream(title: &str, game_id: &str, game_name: &str) -> TwitchStream {
    TwitchStream {
        id: "s1".to_string(),
        user_id: "100".to_string(),
        user_login: "alpha".to_string(),
        user_name: "Alpha".to_string(),
        game_id: game_id.to_string(),
        game_name: game_name.to_string(),
        title: title.to_string(),
        viewer_count: 12,
        started_at: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
        thumbnail_url: "https://example.com/live-{width}x{height}.jpg".to_string(),
    }
}

fn alpha_channel(title: &str, game_id: &str, game_name: &str) -> TwitchChannel {
    TwitchChannel {
        broadcaster_id: "100".to_string(),
        broadcaster_login: "alpha".to_string(),
        broadcaster_name: "Alpha".to_string(),
        game_id: game_id.to_string(),
        game_name: game_name.to_string(),
        title: title.to_string(),
    }
}

fn config(usernames: &[&str]) -> Arc<Config> {
    Arc::new(Config {
        twitch: TwitchCredentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        },
        polling: PollingConfig {
            interval_seconds: 60,
        },
        streamers: usernames
            .iter()
            .map(|username| StreamerConfig {
                username: username.to_string(),
                notifications: NotificationSettings {
                    went_live: true,
                    went_offline: true,
                    title_change: true,
                    category_change: true,
                },
                webhooks: vec!["https://discord.com/api/webhooks/1/a".to_string()],
            })
            .collect(),
        log: LogConfig::default(),
    })
}

#[tokio::test]
async fn full_stream_lifecycle_produces_expected_notifications() {
    let api = Arc::new(ScriptedApi {
        users: HashMap::from([("alpha".to_string(), alpha_user())]),
        streams: Mutex::new(VecDeque::from([
            // cycle 1: offline (initial observation)
            HashMap::new(),
            // cycle 2: live
            HashMap::from([("alpha".to_string(), alpha_stream("Casual run", "1", "Tetris"))]),
            // cycle 3: still live, new title and category
            HashMap::from([("alpha".to_string(), alpha_stream("Ranked!", "2", "Chess"))]),
            // cycle 4: offline again
            HashMap::new(),
        ])),
        // Channel metadata mirrors the latest channel settings; it starts out
        // matching the upcoming stream and is updated below after the title
        // and category change.
        channels: Mutex::new(HashMap::from([(
            "alpha".to_string(),
            alpha_channel("Casual run", "1", "Tetris"),
        )])),
        vod: Some(TwitchVideo {
            id: "v1".to_string(),
            user_id: "100".to_string(),
            user_login: "alpha".to_string(),
            title: "Ranked!".to_string(),
            url: "https://twitch.tv/videos/v1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
            duration: "2h0m0s".to_string(),
            thumbnail_url: "https://example.com/vod-%{width}x%{height}.jpg".to_string(),
        }),
    });

    let handler = Arc::new(CollectingHandler::default());
    let mut poller = Poller::new(
        Arc::clone(&api) as Arc<dyn TwitchApi>,
        config(&["Alpha"]),
        Arc::clone(&handler) as Arc<dyn ChangeHandler>,
    )
    .await
    .unwrap();

    for _ in 0..3 {
        poller.run_cycle().await.unwrap();
    }

    // The channel settings now reflect the renamed stream, so the offline
    // fallback does not look like yet another title/category change.
    api.channels.lock().unwrap().insert(
        "alpha".to_string(),
        alpha_channel("Ranked!", "2", "Chess"),
    );
    poller.run_cycle().await.unwrap();

    let calls = handler.calls();
    assert_eq!(calls.len(), 3, "initial offline cycle must not notify");

    // cycle 2: went live
    assert_eq!(calls[0].0, "Alpha");
    assert_eq!(calls[0].1.len(), 1);
    assert_eq!(calls[0].1[0].kind(), ChangeKind::WentLive);

    // cycle 3: composite title+category change
    assert_eq!(calls[1].1.len(), 1);
    match &calls[1].1[0] {
        ChangeEvent::TitleAndCategoryChanged {
            old_title,
            new_title,
            old_category,
            new_category,
            ..
        } => {
            assert_eq!(old_title, "Casual run");
            assert_eq!(new_title, "Ranked!");
            assert_eq!(old_category, "Tetris");
            assert_eq!(new_category, "Chess");
        }
        other => panic!("expected composite, got {:?}", other),
    }

    // cycle 4: went offline with VOD enrichment and the original start time
    assert_eq!(calls[2].1.len(), 1);
    match &calls[2].1[0] {
        ChangeEvent::WentOffline {
            started_at, vod, ..
        } => {
            assert_eq!(
                *started_at,
                Some(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())
            );
            let vod = vod.as_ref().expect("vod attached");
            assert_eq!(vod.url, "https://twitch.tv/videos/v1");
            assert_eq!(vod.thumbnail_url, "https://example.com/vod-440x248.jpg");
        }
        other => panic!("expected WentOffline, got {:?}", other),
    }

    // Final snapshot: offline, carrying the last-known title from channel data.
    let state = poller.state().get("alpha").unwrap();
    assert!(!state.is_live);
    assert_eq!(state.title, "Ranked!");
    assert_eq!(state.started_at, None);
    assert_eq!(state.thumbnail_url, None);
}

#[tokio::test]
async fn unresolvable_streamer_never_blocks_the_resolved_one() {
    let api = Arc::new(ScriptedApi {
        users: HashMap::from([("alpha".to_string(), alpha_user())]),
        streams: Mutex::new(VecDeque::from([HashMap::from([(
            "alpha".to_string(),
            alpha_stream("Casual run", "1", "Tetris"),
        )])])),
        channels: Mutex::new(HashMap::new()),
        vod: None,
    });

    let handler = Arc::new(CollectingHandler::default());
    let mut poller = Poller::new(
        api,
        config(&["alpha", "ghost"]),
        Arc::clone(&handler) as Arc<dyn ChangeHandler>,
    )
    .await
    .unwrap();
    poller.run_cycle().await.unwrap();

    // Alpha's initial live snapshot still notifies; ghost is skipped silently.
    let calls = handler.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "alpha");
    assert_eq!(calls[0].1[0].kind(), ChangeKind::WentLive);
    assert!(poller.state().has("alpha"));
    assert!(!poller.state().has("ghost"));
}
