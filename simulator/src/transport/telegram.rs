use poolwatchcore::interface::{NotificationTransport, TransportError, TransportResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API client posting to a single chat.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramTransport {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self::with_base_url(API_BASE, token, chat_id)
    }

    pub fn with_base_url(base: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/bot{}", base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        }
    }

    /// Reads `TELEGRAM_TOKEN` and `TELEGRAM_CHAT_ID`; both must be non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let token = lookup("TELEGRAM_TOKEN").filter(|v| !v.trim().is_empty())?;
        let chat_id = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty())?;
        Some(Self::new(token.trim(), chat_id.trim()))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn check(response: reqwest::Response) -> TransportResult<()> {
        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Request(format!("{}: {}", status, e)))?;
        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(TransportError::Rejected(
                body.description
                    .unwrap_or_else(|| status.to_string()),
            ))
        }
    }

    async fn upload(
        &self,
        method: &str,
        field: &'static str,
        path: &Path,
        caption: &str,
    ) -> TransportResult<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TransportError::Media(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.to_string());
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part(field, Part::bytes(bytes).file_name(file_name));
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::check(response).await
    }
}

impl NotificationTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(&self, text: &str) -> TransportResult<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::check(response).await
    }

    async fn send_photo(&self, path: &Path, caption: &str) -> TransportResult<()> {
        self.upload("sendPhoto", "photo", path, caption).await
    }

    /// GIF clips go through `sendAnimation`; anything else as a video.
    async fn send_video(&self, path: &Path, caption: &str) -> TransportResult<()> {
        let is_gif = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("gif"));
        if is_gif {
            self.upload("sendAnimation", "animation", path, caption).await
        } else {
            self.upload("sendVideo", "video", path, caption).await
        }
    }
}
