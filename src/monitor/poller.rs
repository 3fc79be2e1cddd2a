//! Poll-cycle orchestration and scheduling.
//!
//! One cycle is fetch → detect → combine → enrich → filter → dispatch →
//! commit across all watched streamers, strictly sequential per streamer.
//! The scheduler runs cycles inline in its timer loop, so two cycles can
//! never overlap; a tick that falls due while a cycle is still running is
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::config::{Config, StreamerConfig};
use crate::twitch::TwitchApi;
use crate::twitch::types::TwitchUser;

use super::detector::{ChangeEvent, VodInfo, combine_changes, detect_changes};
use super::state::{StateStore, StreamerState, canonical_login};

/// Dimensions substituted into the VOD thumbnail template.
const VOD_THUMBNAIL_WIDTH: &str = "440";
const VOD_THUMBNAIL_HEIGHT: &str = "248";

/// Callback boundary towards the presentation layer.
///
/// Invoked once per streamer per cycle when at least one event survives
/// filtering; the implementation renders the events and delivers them.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn on_changes(&self, changes: &[ChangeEvent], streamer: &StreamerConfig) -> Result<()>;
}

/// Polls the watched streamers and drives change detection.
pub struct Poller {
    api: Arc<dyn TwitchApi>,
    config: Arc<Config>,
    handler: Arc<dyn ChangeHandler>,
    state: StateStore,
    /// Identities resolved once at startup, keyed by canonical login.
    users: HashMap<String, TwitchUser>,
}

impl Poller {
    /// Create a poller and resolve the watched identities.
    ///
    /// A streamer that cannot be resolved is logged and skipped for the
    /// process lifetime; only a restart retries resolution.
    pub async fn new(
        api: Arc<dyn TwitchApi>,
        config: Arc<Config>,
        handler: Arc<dyn ChangeHandler>,
    ) -> Result<Self> {
        let logins: Vec<String> = config
            .streamers
            .iter()
            .map(|s| canonical_login(&s.username))
            .collect();
        let users = api.get_users(&logins).await?;

        for streamer in &config.streamers {
            if !users.contains_key(&canonical_login(&streamer.username)) {
                warn!(
                    streamer = %streamer.username,
                    "Twitch user not found, skipping for this run"
                );
            }
        }

        Ok(Self {
            api,
            config,
            handler,
            state: StateStore::new(),
            users,
        })
    }

    /// The last committed snapshots.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Run one full poll cycle.
    ///
    /// An error from either batched upstream call aborts the whole cycle and
    /// leaves every streamer's stored snapshot untouched; the next scheduled
    /// cycle proceeds independently.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let logins: Vec<String> = self
            .config
            .streamers
            .iter()
            .map(|s| canonical_login(&s.username))
            .filter(|login| self.users.contains_key(login))
            .collect();
        if logins.is_empty() {
            debug!("No resolved streamers to poll");
            return Ok(());
        }

        let streams = self.api.get_streams(&logins).await?;

        // Channel metadata is only needed as a fallback for streamers that are
        // not currently live; skip the call entirely when everyone is live.
        let offline_ids: Vec<String> = logins
            .iter()
            .filter(|login| !streams.contains_key(*login))
            .filter_map(|login| self.users.get(login).map(|u| u.id.clone()))
            .collect();
        let channels = if offline_ids.is_empty() {
            HashMap::new()
        } else {
            self.api.get_channels(&offline_ids).await?
        };

        for streamer in &self.config.streamers {
            let login = canonical_login(&streamer.username);
            let Some(user) = self.users.get(&login) else {
                continue;
            };

            let new_state =
                StreamerState::from_sources(user, streams.get(&login), channels.get(&login));
            let previous = self.state.get(&login);
            let initial_poll = previous.is_none();

            let mut changes = detect_changes(previous, &new_state);

            if initial_poll {
                info!(
                    streamer = %new_state.display_name,
                    live = new_state.is_live,
                    category = %new_state.category_name,
                    "Initial state observed"
                );
                // The detector treats the first observation as no transition;
                // an already-live first snapshot still warrants a notification.
                if new_state.is_live {
                    changes.push(ChangeEvent::WentLive {
                        state: new_state.clone(),
                    });
                }
            }

            let mut changes = combine_changes(changes);

            for change in &mut changes {
                if let ChangeEvent::WentOffline { vod, .. } = change {
                    match self.api.get_latest_vod(&user.id).await {
                        Ok(Some(video)) => {
                            *vod = Some(VodInfo {
                                url: video.url,
                                thumbnail_url: video
                                    .thumbnail_url
                                    .replace("%{width}", VOD_THUMBNAIL_WIDTH)
                                    .replace("%{height}", VOD_THUMBNAIL_HEIGHT),
                            });
                        }
                        Ok(None) => {
                            debug!(streamer = %login, "No VOD found for ended stream");
                        }
                        Err(e) => {
                            warn!(
                                streamer = %login,
                                error = %e,
                                "VOD lookup failed, notifying without it"
                            );
                        }
                    }
                }
            }

            let filtered: Vec<ChangeEvent> = changes
                .into_iter()
                .filter(|c| c.is_notifiable(&streamer.notifications))
                .collect();

            if !filtered.is_empty()
                && let Err(e) = self.handler.on_changes(&filtered, streamer).await
            {
                warn!(
                    streamer = %login,
                    error = %e,
                    "Change handler failed, snapshot is committed anyway"
                );
            }

            // Unconditional commit: a delivery failure must not cause the same
            // change to be re-detected on the next cycle.
            self.state.set(&login, new_state);
        }

        Ok(())
    }

    /// Spawn the polling loop: an immediate first cycle, then one cycle per
    /// interval tick.
    ///
    /// Cycles run inline in the loop, so ticks never overlap; overdue ticks
    /// are dropped. Stopping cancels future ticks but lets an in-flight cycle
    /// run to completion.
    pub fn spawn(mut self) -> PollerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interval_duration = self.config.poll_interval();
        let streamer_count = self.config.streamers.len();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_secs = interval_duration.as_secs(),
                streamers = streamer_count,
                "Polling started"
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Polling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let started = Instant::now();
                        if let Err(e) = self.run_cycle().await {
                            error!(error = %e, "Poll cycle failed");
                        }
                        let elapsed = started.elapsed();
                        if elapsed > interval_duration {
                            warn!(
                                elapsed_ms = elapsed.as_millis() as u64,
                                "Poll cycle overran the interval, overdue ticks are dropped"
                            );
                        }
                    }
                }
            }
        });

        PollerHandle { cancel, task }
    }
}

/// Handle for stopping a spawned poller.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Cancel future ticks and wait for the loop to exit.
    ///
    /// An in-flight cycle runs to completion first.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
