use std::future::Future;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("rejected by remote: {0}")]
    Rejected(String),
    #[error("media unavailable: {0}")]
    Media(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Outbound notification channel (chat bot, pager, console).
///
/// Calls are fire-and-forget from the monitor's point of view: the dispatcher
/// awaits them on its own workers and only logs the outcome.
pub trait NotificationTransport: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn send_text(&self, text: &str) -> impl Future<Output = TransportResult<()>> + Send;

    fn send_photo(
        &self,
        path: &Path,
        caption: &str,
    ) -> impl Future<Output = TransportResult<()>> + Send;

    fn send_video(
        &self,
        path: &Path,
        caption: &str,
    ) -> impl Future<Output = TransportResult<()>> + Send;
}
