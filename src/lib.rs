//! twitch-notifier library crate.
//!
//! Watches a set of Twitch channels, detects live/offline transitions and
//! title/category changes between consecutive polls, and hands the resulting
//! change events to a notification handler (Discord webhooks in the binary).

pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod twitch;

pub use error::{Error, Result};
