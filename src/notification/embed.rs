//! Change event → Discord embed rendering.
//!
//! Pure: same event and clock always produce the same embed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitor::ChangeEvent;

/// Preview/thumbnail dimensions substituted into image template URLs.
const IMAGE_WIDTH: &str = "440";
const IMAGE_HEIGHT: &str = "248";

// Embed colors per change kind.
const COLOR_WENT_LIVE: u32 = 0x9146ff; // Twitch purple
const COLOR_WENT_OFFLINE: u32 = 0x808080;
const COLOR_TITLE_CHANGED: u32 = 0x00ff00;
const COLOR_CATEGORY_CHANGED: u32 = 0xff9900;
const COLOR_TITLE_AND_CATEGORY_CHANGED: u32 = 0x00ccff;

/// A Discord embed object.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscordEmbed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Render a change event as a Discord embed.
pub fn build_embed(change: &ChangeEvent) -> DiscordEmbed {
    build_embed_at(change, Utc::now())
}

/// Render with an explicit clock.
pub fn build_embed_at(change: &ChangeEvent, now: DateTime<Utc>) -> DiscordEmbed {
    let state = change.state();

    let mut embed = DiscordEmbed {
        url: Some(format!("https://twitch.tv/{}", state.username)),
        timestamp: Some(now.to_rfc3339()),
        author: Some(EmbedAuthor {
            name: state.display_name.clone(),
            icon_url: Some(state.profile_image_url.clone()),
        }),
        ..Default::default()
    };

    match change {
        ChangeEvent::WentLive { state } => {
            embed.title = "Stream started".to_string();
            embed.color = COLOR_WENT_LIVE;
            embed.description = Some(if state.title.is_empty() {
                "(no title)".to_string()
            } else {
                state.title.clone()
            });

            let category = if state.category_name.is_empty() {
                "(none)".to_string()
            } else {
                state.category_name.clone()
            };
            let mut fields = vec![EmbedField::new("Category", category, true)];

            if let Some(started_at) = state.started_at {
                fields.push(EmbedField::new(
                    "Started",
                    started_at.format("%H:%M UTC").to_string(),
                    true,
                ));
                if let Some(elapsed) = format_elapsed(started_at, now) {
                    embed.footer = Some(EmbedFooter { text: elapsed });
                }
            }
            embed.fields = fields;

            if let Some(thumbnail_url) = &state.thumbnail_url {
                embed.image = Some(EmbedImage {
                    url: thumbnail_url
                        .replace("{width}", IMAGE_WIDTH)
                        .replace("{height}", IMAGE_HEIGHT),
                });
            }
        }

        ChangeEvent::WentOffline {
            started_at, vod, ..
        } => {
            embed.title = "Stream ended".to_string();
            embed.color = COLOR_WENT_OFFLINE;
            embed.description = Some("The stream has ended.".to_string());

            let mut fields = vec![EmbedField::new(
                "Ended",
                now.format("%H:%M UTC").to_string(),
                true,
            )];
            if let Some(started_at) = started_at {
                fields.push(EmbedField::new(
                    "Duration",
                    format_duration(*started_at, now),
                    true,
                ));
            }
            if let Some(vod) = vod {
                fields.push(EmbedField::new(
                    "VOD",
                    format!("[Watch the VOD]({})", vod.url),
                    false,
                ));
                embed.image = Some(EmbedImage {
                    url: vod.thumbnail_url.clone(),
                });
            }
            embed.fields = fields;
        }

        ChangeEvent::TitleChanged {
            state,
            old_title,
            new_title,
        } => {
            embed.title = "Title changed".to_string();
            embed.color = COLOR_TITLE_CHANGED;
            embed.fields = vec![
                EmbedField::new("Before", or_placeholder(old_title, "(none)"), false),
                EmbedField::new("After", or_placeholder(new_title, "(none)"), false),
            ];
            if state.is_live {
                embed.footer = Some(EmbedFooter {
                    text: "Currently live".to_string(),
                });
            }
        }

        ChangeEvent::CategoryChanged {
            state,
            old_category,
            new_category,
        } => {
            embed.title = "Category changed".to_string();
            embed.color = COLOR_CATEGORY_CHANGED;
            embed.fields = vec![
                EmbedField::new("Before", or_placeholder(old_category, "(none)"), true),
                EmbedField::new("After", or_placeholder(new_category, "(none)"), true),
            ];
            if state.is_live {
                embed.footer = Some(EmbedFooter {
                    text: "Currently live".to_string(),
                });
            }
        }

        ChangeEvent::TitleAndCategoryChanged {
            state,
            old_title,
            new_title,
            old_category,
            new_category,
        } => {
            embed.title = "Title & category changed".to_string();
            embed.color = COLOR_TITLE_AND_CATEGORY_CHANGED;
            embed.fields = vec![
                EmbedField::new(
                    "Title",
                    format!(
                        "{}\n→ {}",
                        or_placeholder(old_title, "(none)"),
                        or_placeholder(new_title, "(none)")
                    ),
                    false,
                ),
                EmbedField::new(
                    "Category",
                    format!(
                        "{}\n→ {}",
                        or_placeholder(old_category, "(none)"),
                        or_placeholder(new_category, "(none)")
                    ),
                    false,
                ),
            ];
            if state.is_live {
                embed.footer = Some(EmbedFooter {
                    text: "Currently live".to_string(),
                });
            }
        }
    }

    embed
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// "live for 1h 05m" style footer text; `None` for streams under a minute old
/// or with a start time in the future.
fn format_elapsed(started_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    let minutes = (now - started_at).num_minutes();
    if minutes < 1 {
        return None;
    }

    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours == 0 {
        Some(format!("live for {}m", mins))
    } else {
        Some(format!("live for {}h {:02}m", hours, mins))
    }
}

fn format_duration(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let total_minutes = (now - started_at).num_minutes().max(0);
    let hours = total_minutes / 60;
    let mins = total_minutes % 60;
    if hours == 0 {
        format!("{}m", mins)
    } else {
        format!("{}h {:02}m", hours, mins)
    }
}
