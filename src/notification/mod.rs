//! Discord notification rendering and delivery.

pub mod embed;
pub mod webhook;

pub use embed::{DiscordEmbed, build_embed, build_embed_at};
pub use webhook::{WebhookPayload, WebhookSender};
