pub mod console;
pub mod telegram;

use console::ConsoleTransport;
use log::info;
use poolwatchcore::interface::{NotificationTransport, TransportResult};
use std::path::Path;
use telegram::TelegramTransport;

/// Transport chosen at startup.
#[derive(Debug, Clone)]
pub enum AnyTransport {
    Telegram(TelegramTransport),
    Console(ConsoleTransport),
}

impl AnyTransport {
    /// Telegram when credentials are present and not overridden, else console.
    pub fn select(console_only: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if !console_only {
            if let Some(telegram) = TelegramTransport::from_lookup(lookup) {
                info!("notifications go to Telegram");
                return AnyTransport::Telegram(telegram);
            }
        }
        info!("notifications are logged to the console");
        AnyTransport::Console(ConsoleTransport)
    }
}

impl NotificationTransport for AnyTransport {
    fn name(&self) -> &str {
        match self {
            AnyTransport::Telegram(inner) => inner.name(),
            AnyTransport::Console(inner) => inner.name(),
        }
    }

    async fn send_text(&self, text: &str) -> TransportResult<()> {
        match self {
            AnyTransport::Telegram(inner) => inner.send_text(text).await,
            AnyTransport::Console(inner) => inner.send_text(text).await,
        }
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> TransportResult<()> {
        match self {
            AnyTransport::Telegram(inner) => inner.send_photo(path, caption).await,
            AnyTransport::Console(inner) => inner.send_photo(path, caption).await,
        }
    }

    async fn send_video(&self, path: &Path, caption: &str) -> TransportResult<()> {
        match self {
            AnyTransport::Telegram(inner) => inner.send_video(path, caption).await,
            AnyTransport::Console(inner) => inner.send_video(path, caption).await,
        }
    }
}
