use std::time::Duration;

use anyhow::{Context, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};

use super::types::{ApiResponse, ChatMessage, File, InlineKeyboardMarkup, Update};
use crate::commands::Choice;

/// Bot API client over plain HTTPS.
///
/// The token is part of every URL, so request errors are stripped of their
/// URL before they are returned.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api: String,
    files: String,
}

impl Client {
    pub fn new(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        let base = api_url.trim_end_matches('/');
        Self {
            http,
            api: format!("{base}/bot{token}"),
            files: format!("{base}/file/bot{token}"),
        }
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Option<Duration>) -> anyhow::Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        trace!(method, "bot api call");
        let mut req = self.http.post(format!("{}/{method}", self.api)).json(params);
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req.send().await.map_err(|e| e.without_url())?;
        let status = resp.status();
        let body: ApiResponse<R> = resp
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("{method}: unreadable response ({status})"))?;
        if !body.ok {
            bail!(
                "{method} failed: {}",
                body.description.unwrap_or_else(|| status.to_string())
            );
        }
        body.result
            .with_context(|| format!("{method}: response has no result"))
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, wait: Duration) -> anyhow::Result<Vec<Update>> {
        let params = json!({
            "offset": offset,
            "timeout": wait.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let updates: Vec<Update> = self
            .call("getUpdates", &params, Some(wait + Duration::from_secs(10)))
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "updates received");
        }
        Ok(updates)
    }

    /// Send `text` to `chat_id`, attaching `choices` as an inline keyboard.
    pub async fn send_message(&self, chat_id: i64, text: &str, choices: &[Choice]) -> anyhow::Result<ChatMessage> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if !choices.is_empty() {
            params["reply_markup"] = serde_json::to_value(InlineKeyboardMarkup::from_choices(choices))?;
        }
        self.call("sendMessage", &params, None).await
    }

    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> anyhow::Result<()> {
        let params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        let _: Value = self.call("editMessageText", &params, None).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, id: &str) -> anyhow::Result<()> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": id }), None)
            .await?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> anyhow::Result<File> {
        self.call("getFile", &json!({ "file_id": file_id }), None).await
    }

    /// Fetch the bytes of a file resolved with [`Client::get_file`].
    pub async fn download(&self, file: &File) -> anyhow::Result<Vec<u8>> {
        let path = file
            .file_path
            .as_deref()
            .with_context(|| format!("file {} has no download path", file.file_id))?;
        let resp = self
            .http
            .get(format!("{}/{path}", self.files))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.without_url())?;
        let bytes = resp.bytes().await.map_err(|e| e.without_url())?;
        trace!(file_id = %file.file_id, len = bytes.len(), "file downloaded");
        Ok(bytes.to_vec())
    }
}
