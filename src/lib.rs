//! Voice and text translation bot for English and Spanish.
//!
//! Inbound messages flow through the [`Pipeline`]: voice is transcribed,
//! text language is identified, content is translated between English and
//! Spanish, emotions are scored, and localized replies are chunked to the
//! transport's message limit. Telegram is the bundled transport.

mod app;
pub mod args;
pub mod commands;
mod emotion;
mod error;
mod i18n;
mod language;
mod language_id;
pub mod logging;
mod message;
mod pipeline;
mod preferences;
pub mod reply;
pub mod shutdown;
pub mod telegram;
mod transcriber;
mod translator;

pub use app::{build_pipeline, run};
pub use emotion::{
    Emotion, EmotionClassifier, EmotionModel, EmotionPolicy, EmotionScore, HttpEmotionModel,
    format_emotions, select,
};
pub use error::{CapabilityError, with_timeout};
pub use i18n::{Localizer, TemplateKey, Templates, UiLanguage};
pub use language::{LanguageCode, flag_for};
pub use language_id::{
    FallbackDetector, LanguageIdentifier, LinguaDetector, MIN_CONFIDENCE, PrimaryDetector,
    WhatlangDetector,
};
pub use message::{Message, Payload, Sender};
pub use pipeline::{Outbox, Outcome, Pipeline};
pub use preferences::{InMemoryPreferences, PreferenceStore, UserId};
pub use reply::ReplyFormatter;
pub use transcriber::{BEAM_SIZE, HttpTranscriber, Transcriber, Transcription};
pub use translator::{
    Direction, HttpTranslationBackend, MAX_NEW_TOKENS, Target, Translation, TranslationBackend,
    Translator,
};
