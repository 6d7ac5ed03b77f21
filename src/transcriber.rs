use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CapabilityError, check_status, with_timeout};

/// Beam width requested from the recognizer.
pub const BEAM_SIZE: u32 = 5;

/// Result of transcribing one voice clip.
///
/// An empty `text` means nothing could be recognized.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    /// Raw language code reported by the recognizer, `"unknown"` if absent.
    pub language: String,
    /// Language probability in `[0, 1]`.
    pub confidence: f32,
}

impl Transcription {
    /// Assemble a transcription from recognized segments, joining the trimmed
    /// non-empty segments with single spaces.
    pub fn from_segments<S: AsRef<str>>(
        segments: &[S],
        language: Option<String>,
        confidence: Option<f32>,
    ) -> Self {
        let text = segments
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            text: text.trim().to_string(),
            language: language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            confidence: confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        }
    }
}

/// Speech recognition capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, CapabilityError>;
}

#[derive(Debug, Serialize)]
struct AsrRequest {
    audio_b64: String,
    language: Option<String>,
    task: &'static str,
    beam_size: u32,
    vad_filter: bool,
}

#[derive(Debug, Deserialize)]
struct AsrResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    segments: Vec<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    language_probability: Option<f32>,
}

/// [`Transcriber`] talking to a faster-whisper HTTP service.
///
/// Language is always auto-detected and voice activity filtering is enabled.
#[derive(Clone)]
pub struct HttpTranscriber {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTranscriber {
    pub fn new(http: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn request(&self, audio: &[u8]) -> Result<Transcription, CapabilityError> {
        let req = AsrRequest {
            audio_b64: BASE64.encode(audio),
            language: None,
            task: "transcribe",
            beam_size: BEAM_SIZE,
            vad_filter: true,
        };
        let url = format!("{}/asr", self.base_url);
        debug!(%url, bytes = audio.len(), "sending audio for transcription");
        let resp = self.http.post(&url).json(&req).send().await?;
        let body: AsrResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;
        let out = if body.segments.is_empty() {
            Transcription::from_segments(
                &[body.text.unwrap_or_default()],
                body.language,
                body.language_probability,
            )
        } else {
            Transcription::from_segments(&body.segments, body.language, body.language_probability)
        };
        debug!(chars = out.text.len(), lang = %out.language, "transcription received");
        Ok(out)
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, CapabilityError> {
        with_timeout(self.timeout, self.request(audio)).await
    }
}
