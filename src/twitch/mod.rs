//! Twitch Helix API client.

pub mod api;
pub mod types;

pub use api::{HelixClient, TwitchApi};
