use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CapabilityError, check_status, with_timeout};
use crate::language::LanguageCode;

/// Upper bound on generated tokens per translation.
pub const MAX_NEW_TOKENS: u32 = 512;

/// Supported translation directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    EnToEs,
    EsToEn,
}

impl Direction {
    /// Direction for a raw source language code, `None` when unsupported.
    pub fn for_source(code: &str) -> Option<Self> {
        match LanguageCode::from_prefix(code) {
            LanguageCode::En => Some(Direction::EnToEs),
            LanguageCode::Es => Some(Direction::EsToEn),
            LanguageCode::Other => None,
        }
    }

    pub fn source(&self) -> LanguageCode {
        match self {
            Direction::EnToEs => LanguageCode::En,
            Direction::EsToEn => LanguageCode::Es,
        }
    }

    pub fn target(&self) -> LanguageCode {
        match self {
            Direction::EnToEs => LanguageCode::Es,
            Direction::EsToEn => LanguageCode::En,
        }
    }
}

/// Where a translation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    En,
    Es,
    /// No translation was performed.
    Same,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::En => "en",
            Target::Es => "es",
            Target::Same => "same",
        }
    }
}

impl From<LanguageCode> for Target {
    fn from(code: LanguageCode) -> Self {
        match code {
            LanguageCode::En => Target::En,
            LanguageCode::Es => Target::Es,
            LanguageCode::Other => Target::Same,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    pub target: Target,
}

impl Translation {
    /// Untranslated input, distinct from a translation that happens to match it.
    pub fn passthrough(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: Target::Same,
        }
    }

    pub fn is_translated(&self) -> bool {
        self.target != Target::Same && !self.text.is_empty()
    }
}

/// Machine translation model for a single direction per call.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, direction: Direction, text: &str) -> Result<String, CapabilityError>;
}

/// English ↔ Spanish translator that never fails.
///
/// Unsupported source languages and backend failures both yield a passthrough
/// [`Translation`]. A failed attempt is not retried.
#[derive(Clone)]
pub struct Translator {
    backend: Arc<dyn TranslationBackend>,
    timeout: Duration,
}

impl Translator {
    pub fn new(backend: Arc<dyn TranslationBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn translate(&self, source_lang: &str, text: &str) -> Translation {
        if text.is_empty() {
            return Translation::passthrough("");
        }
        let Some(direction) = Direction::for_source(source_lang) else {
            debug!(%source_lang, "unsupported source language; passing through");
            return Translation::passthrough(text);
        };
        match with_timeout(self.timeout, self.backend.translate(direction, text)).await {
            Ok(out) => Translation {
                text: out.trim().to_string(),
                target: direction.target().into(),
            },
            Err(e) => {
                warn!(?e, ?direction, "translation failed; passing original text through");
                Translation::passthrough(text)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    src_lang: &'static str,
    tgt_lang: &'static str,
    text: &'a str,
    max_new_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    text: String,
}

/// [`TranslationBackend`] for an HTTP service hosting the en→es and es→en
/// MarianMT models.
#[derive(Clone)]
pub struct HttpTranslationBackend {
    http: Client,
    base_url: String,
}

impl HttpTranslationBackend {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    async fn translate(&self, direction: Direction, text: &str) -> Result<String, CapabilityError> {
        let req = TranslateRequest {
            src_lang: direction.source().as_str(),
            tgt_lang: direction.target().as_str(),
            text,
            max_new_tokens: MAX_NEW_TOKENS,
        };
        let url = format!("{}/translate", self.base_url);
        let resp = self.http.post(&url).json(&req).send().await?;
        let body: TranslateResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(Direction, String)>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl TranslationBackend for Recording {
        async fn translate(
            &self,
            direction: Direction,
            text: &str,
        ) -> Result<String, CapabilityError> {
            self.calls.lock().unwrap().push((direction, text.to_string()));
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            if self.fail {
                return Err(CapabilityError::Malformed("bad".into()));
            }
            Ok(format!(" <{}> ", text))
        }
    }

    fn translator(backend: Arc<Recording>) -> Translator {
        Translator::new(backend, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn empty_text_is_same() {
        let backend = Arc::new(Recording::default());
        let out = translator(backend.clone()).translate("en", "").await;
        assert_eq!(out, Translation::passthrough(""));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn routes_by_prefix() {
        let backend = Arc::new(Recording::default());
        let t = translator(backend.clone());
        let out = t.translate("EN", "hello").await;
        assert_eq!(out.text, "<hello>");
        assert_eq!(out.target, Target::Es);
        let out = t.translate("es-MX", "hola").await;
        assert_eq!(out.target, Target::En);
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].0, Direction::EnToEs);
        assert_eq!(calls[1].0, Direction::EsToEn);
    }

    #[tokio::test]
    async fn unsupported_language_passes_through() {
        let backend = Arc::new(Recording::default());
        let out = translator(backend.clone()).translate("xx", "hello").await;
        assert_eq!(out.text, "hello");
        assert_eq!(out.target, Target::Same);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_degrades_once_without_retry() {
        let backend = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let out = translator(backend.clone()).translate("es", "hola").await;
        assert_eq!(out, Translation::passthrough("hola"));
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_degrades_to_passthrough() {
        let backend = Arc::new(Recording {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let out = translator(backend).translate("en", "slow").await;
        assert_eq!(out, Translation::passthrough("slow"));
    }

    #[tokio::test]
    async fn http_backend_sends_direction_and_budget() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/translate").json_body(json!({
                    "src_lang": "en",
                    "tgt_lang": "es",
                    "text": "good morning",
                    "max_new_tokens": 512
                }));
                then.status(200).json_body(json!({ "text": "buenos días " }));
            })
            .await;

        let backend = Arc::new(HttpTranslationBackend::new(Client::new(), server.base_url()));
        let out = Translator::new(backend, Duration::from_secs(5))
            .translate("en", "good morning")
            .await;
        mock.assert_async().await;
        assert_eq!(out.text, "buenos días");
        assert_eq!(out.target, Target::Es);
    }
}
