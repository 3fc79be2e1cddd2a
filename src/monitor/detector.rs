//! Change detection between consecutive snapshots.
//!
//! [`detect_changes`] compares the previous and current snapshot of one
//! streamer and produces typed change events; [`combine_changes`] merges a
//! simultaneous title and category change into one composite event.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NotificationSettings;

use super::state::StreamerState;

/// Recording metadata attached to an offline event by best-effort enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VodInfo {
    pub url: String,
    pub thumbnail_url: String,
}

/// The kind of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    WentLive,
    WentOffline,
    TitleChanged,
    CategoryChanged,
    TitleAndCategoryChanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::WentLive => "went_live",
            ChangeKind::WentOffline => "went_offline",
            ChangeKind::TitleChanged => "title_changed",
            ChangeKind::CategoryChanged => "category_changed",
            ChangeKind::TitleAndCategoryChanged => "title_and_category_changed",
        };
        f.write_str(name)
    }
}

/// A detected difference between two consecutive snapshots.
///
/// Every variant carries the new snapshot as context. The composite variant
/// only exists after [`combine_changes`] and subsumes the two simple kinds it
/// replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    WentLive {
        state: StreamerState,
    },
    WentOffline {
        state: StreamerState,
        /// Start time of the stream that just ended, from the previous snapshot.
        started_at: Option<DateTime<Utc>>,
        /// Attached by enrichment when a recording is found.
        vod: Option<VodInfo>,
    },
    TitleChanged {
        state: StreamerState,
        old_title: String,
        new_title: String,
    },
    CategoryChanged {
        state: StreamerState,
        old_category: String,
        new_category: String,
    },
    TitleAndCategoryChanged {
        state: StreamerState,
        old_title: String,
        new_title: String,
        old_category: String,
        new_category: String,
    },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::WentLive { .. } => ChangeKind::WentLive,
            ChangeEvent::WentOffline { .. } => ChangeKind::WentOffline,
            ChangeEvent::TitleChanged { .. } => ChangeKind::TitleChanged,
            ChangeEvent::CategoryChanged { .. } => ChangeKind::CategoryChanged,
            ChangeEvent::TitleAndCategoryChanged { .. } => ChangeKind::TitleAndCategoryChanged,
        }
    }

    /// The snapshot the event was detected against.
    pub fn state(&self) -> &StreamerState {
        match self {
            ChangeEvent::WentLive { state }
            | ChangeEvent::WentOffline { state, .. }
            | ChangeEvent::TitleChanged { state, .. }
            | ChangeEvent::CategoryChanged { state, .. }
            | ChangeEvent::TitleAndCategoryChanged { state, .. } => state,
        }
    }

    /// Whether the event passes the streamer's notification flags.
    ///
    /// The composite kind passes when either constituent flag is enabled.
    pub fn is_notifiable(&self, settings: &NotificationSettings) -> bool {
        match self.kind() {
            ChangeKind::WentLive => settings.went_live,
            ChangeKind::WentOffline => settings.went_offline,
            ChangeKind::TitleChanged => settings.title_change,
            ChangeKind::CategoryChanged => settings.category_change,
            ChangeKind::TitleAndCategoryChanged => {
                settings.title_change || settings.category_change
            }
        }
    }
}

/// Compare two consecutive snapshots and produce the detected changes.
///
/// Pure and deterministic. A `None` previous snapshot (first observation)
/// yields no changes; the poller synthesizes a went-live event when the very
/// first snapshot is already live.
///
/// The four predicates are evaluated independently in a fixed order:
/// went-live, went-offline, title-changed, category-changed. An empty new
/// title never counts as a title change; category changes are compared by id
/// regardless of the names.
pub fn detect_changes(
    previous: Option<&StreamerState>,
    current: &StreamerState,
) -> Vec<ChangeEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut changes = Vec::new();

    if !previous.is_live && current.is_live {
        changes.push(ChangeEvent::WentLive {
            state: current.clone(),
        });
    }

    if previous.is_live && !current.is_live {
        changes.push(ChangeEvent::WentOffline {
            state: current.clone(),
            started_at: previous.started_at,
            vod: None,
        });
    }

    if previous.title != current.title && !current.title.is_empty() {
        changes.push(ChangeEvent::TitleChanged {
            state: current.clone(),
            old_title: previous.title.clone(),
            new_title: current.title.clone(),
        });
    }

    if previous.category_id != current.category_id {
        changes.push(ChangeEvent::CategoryChanged {
            state: current.clone(),
            old_category: previous.category_name.clone(),
            new_category: current.category_name.clone(),
        });
    }

    changes
}

/// Merge a simultaneous title change and category change into one composite.
///
/// When both are present the composite is appended after the pass-through
/// events (their relative order is preserved) and uses the title event's
/// snapshot as context. Otherwise the input is returned unmodified.
pub fn combine_changes(changes: Vec<ChangeEvent>) -> Vec<ChangeEvent> {
    let has_title = changes
        .iter()
        .any(|c| matches!(c, ChangeEvent::TitleChanged { .. }));
    let has_category = changes
        .iter()
        .any(|c| matches!(c, ChangeEvent::CategoryChanged { .. }));
    if !(has_title && has_category) {
        return changes;
    }

    let mut combined = Vec::with_capacity(changes.len() - 1);
    let mut title = None;
    let mut category = None;

    for change in changes {
        match change {
            ChangeEvent::TitleChanged {
                state,
                old_title,
                new_title,
            } if title.is_none() => title = Some((state, old_title, new_title)),
            ChangeEvent::CategoryChanged {
                old_category,
                new_category,
                ..
            } if category.is_none() => category = Some((old_category, new_category)),
            other => combined.push(other),
        }
    }

    if let (Some((state, old_title, new_title)), Some((old_category, new_category))) =
        (title, category)
    {
        combined.push(ChangeEvent::TitleAndCategoryChanged {
            state,
            old_title,
            new_title,
            old_category,
            new_category,
        });
    }

    combined
}
