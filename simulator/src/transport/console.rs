use log::info;
use poolwatchcore::interface::{NotificationTransport, TransportError, TransportResult};
use std::path::Path;

/// Logs notifications instead of sending them; used when no bot is configured.
#[derive(Debug, Default, Clone)]
pub struct ConsoleTransport;

impl NotificationTransport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_text(&self, text: &str) -> TransportResult<()> {
        info!("[notify] {}", text);
        Ok(())
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> TransportResult<()> {
        if !path.exists() {
            return Err(TransportError::Media(path.display().to_string()));
        }
        info!("[notify] photo {} - {}", path.display(), caption);
        Ok(())
    }

    async fn send_video(&self, path: &Path, caption: &str) -> TransportResult<()> {
        if !path.exists() {
            return Err(TransportError::Media(path.display().to_string()));
        }
        info!("[notify] clip {} - {}", path.display(), caption);
        Ok(())
    }
}
