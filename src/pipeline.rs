//! Per-message orchestration: transcribe, identify, translate, score, reply.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, trace, warn};

use crate::emotion::{EmotionClassifier, EmotionPolicy, EmotionScore};
use crate::i18n::TemplateKey;
use crate::language::LanguageCode;
use crate::language_id::LanguageIdentifier;
use crate::message::{Message, Payload, Sender};
use crate::reply::ReplyFormatter;
use crate::transcriber::Transcriber;
use crate::translator::{Translation, Translator};

/// Delivers outbound segments back to the sender of the message being handled.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// How a message left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied,
    RejectedUnsupportedLanguage,
    RejectedEmptyTranscription,
}

/// Runs every inbound message through the stages in order.
///
/// Services are constructed once and shared; the pipeline holds no
/// per-message state.
#[derive(Clone)]
pub struct Pipeline {
    identifier: Arc<LanguageIdentifier>,
    transcriber: Arc<dyn Transcriber>,
    translator: Translator,
    emotions: EmotionClassifier,
    formatter: ReplyFormatter,
    policy: EmotionPolicy,
}

impl Pipeline {
    pub fn new(
        identifier: Arc<LanguageIdentifier>,
        transcriber: Arc<dyn Transcriber>,
        translator: Translator,
        emotions: EmotionClassifier,
        formatter: ReplyFormatter,
    ) -> Self {
        Self {
            identifier,
            transcriber,
            translator,
            emotions,
            formatter,
            policy: EmotionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EmotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn formatter(&self) -> &ReplyFormatter {
        &self.formatter
    }

    /// Handle `msg`, logging and swallowing any failure.
    pub async fn handle_guarded(&self, msg: &Message, outbox: &dyn Outbox) -> Option<Outcome> {
        match self.handle(msg, outbox).await {
            Ok(outcome) => {
                debug!(user_id = msg.sender.id, ?outcome, "message handled");
                Some(outcome)
            }
            Err(e) => {
                error!(
                    user_id = msg.sender.id,
                    modality = msg.modality(),
                    error = ?e,
                    "message handling failed"
                );
                None
            }
        }
    }

    pub async fn handle(&self, msg: &Message, outbox: &dyn Outbox) -> anyhow::Result<Outcome> {
        trace!(user_id = msg.sender.id, modality = msg.modality(), "received");
        match &msg.payload {
            Payload::Voice(audio) => self.handle_voice(&msg.sender, audio, outbox).await,
            Payload::Text(text) => self.handle_text(&msg.sender, text, outbox).await,
        }
    }

    async fn handle_voice(
        &self,
        from: &Sender,
        audio: &[u8],
        outbox: &dyn Outbox,
    ) -> anyhow::Result<Outcome> {
        let transcription = self.transcriber.transcribe(audio).await?;
        if transcription.text.is_empty() {
            send_all(outbox, self.formatter.notice(from, TemplateKey::NoTranscription)).await?;
            return Ok(Outcome::RejectedEmptyTranscription);
        }
        trace!(
            user_id = from.id,
            lang = %transcription.language,
            conf = transcription.confidence,
            "transcribed"
        );

        let source = LanguageCode::from_prefix(&transcription.language);
        let translation = self
            .translator
            .translate(&transcription.language, &transcription.text)
            .await;
        trace!(user_id = from.id, target = translation.target.as_str(), "translated");
        let scores = self.score(source, &transcription.text, &translation).await;

        send_all(outbox, self.formatter.transcription(from, &transcription)).await?;
        if translation.is_translated() {
            send_all(
                outbox,
                self.formatter
                    .translation(from, &transcription.language, &translation),
            )
            .await?;
        } else {
            send_all(outbox, self.formatter.notice(from, TemplateKey::TranslationSkipped)).await?;
        }
        send_all(outbox, self.formatter.emotions(from, &scores)).await?;
        Ok(Outcome::Replied)
    }

    async fn handle_text(
        &self,
        from: &Sender,
        text: &str,
        outbox: &dyn Outbox,
    ) -> anyhow::Result<Outcome> {
        let lang = self.identifier.identify(text.trim());
        trace!(user_id = from.id, %lang, "language resolved");
        if !lang.is_supported() {
            send_all(outbox, self.formatter.notice(from, TemplateKey::AnalysisSkipped)).await?;
            return Ok(Outcome::RejectedUnsupportedLanguage);
        }

        let translation = self.translator.translate(lang.as_str(), text).await;
        let scores = self.score(lang, text, &translation).await;

        send_all(outbox, self.formatter.you_wrote(from, lang, text)).await?;
        if translation.is_translated() {
            send_all(
                outbox,
                self.formatter.translation(from, lang.as_str(), &translation),
            )
            .await?;
        }
        send_all(outbox, self.formatter.emotions(from, &scores)).await?;
        Ok(Outcome::Replied)
    }

    /// Score emotions on English text: the original for English sources, the
    /// translation for Spanish ones.
    async fn score(
        &self,
        source: LanguageCode,
        original: &str,
        translation: &Translation,
    ) -> Vec<EmotionScore> {
        let input = match source {
            LanguageCode::Es if !translation.text.is_empty() => translation.text.as_str(),
            _ => original,
        };
        match self.emotions.classify(input, self.policy).await {
            Ok(scores) => scores,
            Err(e) => {
                warn!(?e, "emotion scoring failed; reporting neutral");
                Vec::new()
            }
        }
    }
}

async fn send_all(outbox: &dyn Outbox, segments: Vec<String>) -> anyhow::Result<()> {
    for segment in &segments {
        outbox.send(segment).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{Emotion, EmotionModel};
    use crate::error::CapabilityError;
    use crate::i18n::{Localizer, Templates};
    use crate::language_id::{FallbackDetector, PrimaryDetector};
    use crate::preferences::InMemoryPreferences;
    use crate::reply::DEFAULT_MESSAGE_LIMIT;
    use crate::transcriber::Transcription;
    use crate::translator::{Direction, TranslationBackend};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingOutbox {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingOutbox {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Outbox for RecordingOutbox {
        async fn send(&self, text: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FixedLang(Option<LanguageCode>);

    impl PrimaryDetector for FixedLang {
        fn detect(&self, _text: &str) -> Result<Option<LanguageCode>, CapabilityError> {
            Ok(self.0)
        }

        fn confidences(&self, _text: &str) -> Result<Vec<(LanguageCode, f64)>, CapabilityError> {
            Ok(self.0.map(|l| vec![(l, 0.99)]).unwrap_or_default())
        }
    }

    struct NoGuess;

    impl FallbackDetector for NoGuess {
        fn guess(&self, _text: &str) -> Result<Option<String>, CapabilityError> {
            Ok(None)
        }
    }

    struct FixedTranscriber(Transcription);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Transcription, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
        reply: Option<String>,
    }

    #[async_trait]
    impl TranslationBackend for CountingBackend {
        async fn translate(&self, direction: Direction, text: &str) -> Result<String, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(reply) = &self.reply {
                return Ok(reply.clone());
            }
            Ok(match direction {
                Direction::EnToEs => format!("es:{text}"),
                Direction::EsToEn => format!("en:{text}"),
            })
        }
    }

    #[derive(Default)]
    struct CountingModel {
        inputs: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EmotionModel for CountingModel {
        async fn score(&self, text: &str) -> Result<Vec<EmotionScore>, CapabilityError> {
            self.inputs.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(CapabilityError::Malformed("boom".into()));
            }
            Ok(vec![EmotionScore {
                label: Emotion::Joy,
                score: 0.9,
            }])
        }
    }

    struct Harness {
        pipeline: Pipeline,
        backend: Arc<CountingBackend>,
        model: Arc<CountingModel>,
    }

    fn harness(lang: Option<LanguageCode>, transcription: Transcription, fail_emotion: bool) -> Harness {
        harness_with(lang, transcription, fail_emotion, Arc::default())
    }

    fn harness_with(
        lang: Option<LanguageCode>,
        transcription: Transcription,
        fail_emotion: bool,
        backend: Arc<CountingBackend>,
    ) -> Harness {
        let model = Arc::new(CountingModel {
            fail: fail_emotion,
            ..Default::default()
        });
        let localizer = Localizer::new(
            Arc::new(Templates::embedded().unwrap()),
            Arc::new(InMemoryPreferences::new()),
        );
        let pipeline = Pipeline::new(
            Arc::new(LanguageIdentifier::new(
                Box::new(FixedLang(lang)),
                Box::new(NoGuess),
            )),
            Arc::new(FixedTranscriber(transcription)),
            Translator::new(backend.clone(), Duration::from_secs(5)),
            EmotionClassifier::new(model.clone(), Duration::from_secs(5)),
            ReplyFormatter::new(localizer, DEFAULT_MESSAGE_LIMIT),
        );
        Harness {
            pipeline,
            backend,
            model,
        }
    }

    fn transcription(text: &str, lang: &str, confidence: f32) -> Transcription {
        Transcription {
            text: text.into(),
            language: lang.into(),
            confidence,
        }
    }

    fn english() -> Sender {
        Sender::new(1, Some("en"))
    }

    #[tokio::test]
    async fn english_voice_yields_three_ordered_replies() {
        let h = harness(None, transcription("I love this", "en", 0.92), false);
        let outbox = RecordingOutbox::default();
        let outcome = h
            .pipeline
            .handle(&Message::voice(english(), vec![1, 2, 3]), &outbox)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Replied);
        let sent = outbox.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains("🇬🇧"));
        assert!(sent[0].contains("92%"));
        assert!(sent[0].ends_with("I love this"));
        assert!(sent[1].contains("(en→es)"));
        assert!(sent[1].ends_with("es:I love this"));
        assert!(sent[2].contains("joy 😊 (0.90)"));
        assert_eq!(h.model.inputs.lock().unwrap().as_slice(), ["I love this"]);
    }

    #[tokio::test]
    async fn empty_transcription_sends_single_notice() {
        let h = harness(None, transcription("", "en", 0.5), false);
        let outbox = RecordingOutbox::default();
        let outcome = h
            .pipeline
            .handle(&Message::voice(english(), vec![0]), &outbox)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::RejectedEmptyTranscription);
        assert_eq!(
            outbox.sent(),
            vec!["❌ Could not transcribe anything. Please try again."]
        );
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
        assert!(h.model.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn voice_in_other_language_skips_translation() {
        let h = harness(None, transcription("bonjour", "fr", 0.8), false);
        let outbox = RecordingOutbox::default();
        h.pipeline
            .handle(&Message::voice(english(), vec![0]), &outbox)
            .await
            .unwrap();
        let sent = outbox.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains("🌐"));
        assert_eq!(sent[1], "ℹ️ Not English/Spanish, translation skipped.");
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.model.inputs.lock().unwrap().as_slice(), ["bonjour"]);
    }

    #[tokio::test]
    async fn unsupported_text_is_rejected_without_processing() {
        let h = harness(None, transcription("", "", 0.0), false);
        let outbox = RecordingOutbox::default();
        let outcome = h
            .pipeline
            .handle(&Message::text(english(), "asdkj qpwoe"), &outbox)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::RejectedUnsupportedLanguage);
        assert_eq!(
            outbox.sent(),
            vec!["🚫 Only English and Spanish messages are processed (analysis skipped)."]
        );
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
        assert!(h.model.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spanish_text_scores_translated_english() {
        let h = harness(
            Some(LanguageCode::Es),
            transcription("", "", 0.0),
            false,
        );
        let outbox = RecordingOutbox::default();
        h.pipeline
            .handle(&Message::text(Sender::new(2, Some("es-MX")), "  me encanta  "), &outbox)
            .await
            .unwrap();
        let sent = outbox.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].starts_with("📝 Has escrito 🇪🇸"));
        assert!(sent[0].ends_with(":\n  me encanta  "));
        assert!(sent[1].ends_with("en:  me encanta"));
        assert!(sent[2].contains("alegría"));
        assert_eq!(h.model.inputs.lock().unwrap().as_slice(), ["en:  me encanta"]);
    }

    #[tokio::test]
    async fn blank_spanish_translation_is_skipped_and_original_scored() {
        let backend = Arc::new(CountingBackend {
            reply: Some("   ".into()),
            ..Default::default()
        });
        let h = harness_with(Some(LanguageCode::Es), transcription("", "", 0.0), false, backend);
        let outbox = RecordingOutbox::default();
        let outcome = h
            .pipeline
            .handle(
                &Message::text(Sender::new(2, Some("es")), "me encanta mucho este lugar"),
                &outbox,
            )
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Replied);
        let sent = outbox.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].ends_with("me encanta mucho este lugar"));
        assert!(sent[1].starts_with("🎭"));
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.model.inputs.lock().unwrap().as_slice(),
            ["me encanta mucho este lugar"]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn emotion_failure_degrades_to_neutral() {
        let h = harness(Some(LanguageCode::En), transcription("", "", 0.0), true);
        let outbox = RecordingOutbox::default();
        h.pipeline
            .handle(&Message::text(english(), "what a day"), &outbox)
            .await
            .unwrap();
        let sent = outbox.sent();
        assert_eq!(sent.last().unwrap(), "🎭 Detected emotion(s): neutral 😐");
        assert!(logs_contain("emotion scoring failed"));
    }

    struct BrokenOutbox;

    #[async_trait]
    impl Outbox for BrokenOutbox {
        async fn send(&self, _text: &str) -> anyhow::Result<()> {
            anyhow::bail!("connection reset")
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn guarded_handler_swallows_failures() {
        let h = harness(Some(LanguageCode::En), transcription("", "", 0.0), false);
        let outcome = h
            .pipeline
            .handle_guarded(&Message::text(english(), "hello"), &BrokenOutbox)
            .await;
        assert_eq!(outcome, None);
        assert!(logs_contain("message handling failed"));

        let outbox = RecordingOutbox::default();
        let outcome = h
            .pipeline
            .handle_guarded(&Message::text(english(), "hello again"), &outbox)
            .await;
        assert_eq!(outcome, Some(Outcome::Replied));
    }
}
