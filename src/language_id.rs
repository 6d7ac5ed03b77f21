//! Text language identification restricted to English and Spanish.
//!
//! A two-class primary detector is consulted first. When it is ambiguous the
//! best confidence value decides, but only above [`MIN_CONFIDENCE`]. When the
//! primary detector fails outright a single-guess secondary detector is used.
//! Identification never fails: every error path resolves to
//! [`LanguageCode::Other`].

use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use tracing::{debug, trace, warn};

use crate::error::CapabilityError;
use crate::language::LanguageCode;

/// Confidence required to accept the primary detector's best guess when it
/// declined to classify.
pub const MIN_CONFIDENCE: f64 = 0.70;

/// Minimum distance lingua needs between English and Spanish before it
/// commits to a verdict. Closer calls are reported as ambiguous and go
/// through [`MIN_CONFIDENCE`] instead.
pub const MIN_RELATIVE_DISTANCE: f64 = 0.25;

/// High-precision English/Spanish detector.
pub trait PrimaryDetector: Send + Sync {
    /// Confident classification, `None` when the detector is ambiguous.
    fn detect(&self, text: &str) -> Result<Option<LanguageCode>, CapabilityError>;

    /// Per-language confidence values in `[0, 1]`.
    fn confidences(&self, text: &str) -> Result<Vec<(LanguageCode, f64)>, CapabilityError>;
}

/// Single best guess detector returning a raw language code.
pub trait FallbackDetector: Send + Sync {
    fn guess(&self, text: &str) -> Result<Option<String>, CapabilityError>;
}

/// [`PrimaryDetector`] backed by `lingua` with only English and Spanish loaded.
pub struct LinguaDetector {
    detector: LanguageDetector,
}

impl LinguaDetector {
    pub fn new() -> Self {
        let detector =
            LanguageDetectorBuilder::from_languages(&[Language::English, Language::Spanish])
                .with_minimum_relative_distance(MIN_RELATIVE_DISTANCE)
                .build();
        Self { detector }
    }

    fn map(lang: Language) -> LanguageCode {
        match lang {
            Language::English => LanguageCode::En,
            Language::Spanish => LanguageCode::Es,
            #[allow(unreachable_patterns)]
            _ => LanguageCode::Other,
        }
    }
}

impl Default for LinguaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimaryDetector for LinguaDetector {
    fn detect(&self, text: &str) -> Result<Option<LanguageCode>, CapabilityError> {
        Ok(self.detector.detect_language_of(text).map(Self::map))
    }

    fn confidences(&self, text: &str) -> Result<Vec<(LanguageCode, f64)>, CapabilityError> {
        Ok(self
            .detector
            .compute_language_confidence_values(text)
            .into_iter()
            .map(|(lang, value)| (Self::map(lang), value))
            .collect())
    }
}

/// [`FallbackDetector`] backed by `whatlang`'s trigram model.
///
/// `whatlang` is deterministic, so repeated calls on the same text agree.
#[derive(Default)]
pub struct WhatlangDetector;

impl FallbackDetector for WhatlangDetector {
    fn guess(&self, text: &str) -> Result<Option<String>, CapabilityError> {
        let Some(info) = whatlang::detect(text) else {
            return Ok(None);
        };
        let code = match info.lang() {
            whatlang::Lang::Eng => "en",
            whatlang::Lang::Spa => "es",
            other => other.code(),
        };
        Ok(Some(code.to_string()))
    }
}

/// Classifies free text as `en`, `es` or `other`.
pub struct LanguageIdentifier {
    primary: Box<dyn PrimaryDetector>,
    fallback: Box<dyn FallbackDetector>,
}

impl LanguageIdentifier {
    pub fn new(primary: Box<dyn PrimaryDetector>, fallback: Box<dyn FallbackDetector>) -> Self {
        Self { primary, fallback }
    }

    /// Identifier using `lingua` first and `whatlang` as the fallback.
    pub fn standard() -> Self {
        Self::new(Box::new(LinguaDetector::new()), Box::new(WhatlangDetector))
    }

    pub fn identify(&self, text: &str) -> LanguageCode {
        if text.trim().is_empty() {
            return LanguageCode::Other;
        }
        match self.primary_verdict(text) {
            Ok(code) => {
                trace!(%code, "primary detector verdict");
                code
            }
            Err(e) => {
                warn!(?e, "primary language detector failed; using fallback");
                self.fallback_verdict(text)
            }
        }
    }

    fn primary_verdict(&self, text: &str) -> Result<LanguageCode, CapabilityError> {
        if let Some(code) = self.primary.detect(text)? {
            if code.is_supported() {
                return Ok(code);
            }
        }
        let best = self
            .primary
            .confidences(text)?
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match best {
            Some((code, value)) if value >= MIN_CONFIDENCE && code.is_supported() => Ok(code),
            Some((code, value)) => {
                debug!(%code, value, "primary detector not confident");
                Ok(LanguageCode::Other)
            }
            None => Ok(LanguageCode::Other),
        }
    }

    fn fallback_verdict(&self, text: &str) -> LanguageCode {
        match self.fallback.guess(text) {
            Ok(Some(code)) => LanguageCode::from_prefix(&code),
            Ok(None) => LanguageCode::Other,
            Err(e) => {
                warn!(?e, "fallback language detector failed");
                LanguageCode::Other
            }
        }
    }
}
