//! Process logging setup.
//!
//! The filter threshold comes from the config file and is applied once at
//! startup; a `RUST_LOG` environment variable overrides it entirely. There is
//! no runtime reconfiguration.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogLevel;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any component starts logging.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "twitch_notifier={},reqwest=warn,hyper=warn",
            level.as_str()
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
