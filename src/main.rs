use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use twitch_notifier::config::{Config, StreamerConfig};
use twitch_notifier::monitor::{ChangeEvent, ChangeHandler, Poller};
use twitch_notifier::notification::{WebhookSender, build_embed};
use twitch_notifier::twitch::HelixClient;
use twitch_notifier::{Result, logging};

/// Presentation layer: renders each change as a Discord embed and fans it out
/// to the streamer's configured webhooks.
struct DiscordNotifier {
    sender: WebhookSender,
}

#[async_trait]
impl ChangeHandler for DiscordNotifier {
    async fn on_changes(&self, changes: &[ChangeEvent], streamer: &StreamerConfig) -> Result<()> {
        for change in changes {
            let embed = build_embed(change);
            let state = change.state();
            self.sender
                .send_to_all(
                    &streamer.webhooks,
                    &embed,
                    &state.display_name,
                    &state.profile_image_url,
                )
                .await;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
    let config = Arc::new(Config::load(&config_path)?);
    logging::init(config.log.level);

    let api = Arc::new(HelixClient::new(
        config.twitch.client_id.clone(),
        config.twitch.client_secret.clone(),
    ));
    let handler = Arc::new(DiscordNotifier {
        sender: WebhookSender::new(),
    });

    let poller = Poller::new(api, Arc::clone(&config), handler).await?;
    let handle = poller.spawn();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.stop().await;

    Ok(())
}
