//! Turns pipeline results into localized, length-bounded outbound segments.

use crate::emotion::{EmotionScore, format_emotions};
use crate::i18n::{Localizer, TemplateKey};
use crate::language::{LanguageCode, flag_for};
use crate::message::Sender;
use crate::transcriber::Transcription;
use crate::translator::Translation;

/// Default per-segment limit, matching Telegram's message size.
pub const DEFAULT_MESSAGE_LIMIT: usize = 4096;

/// Split `text` into segments of at most `limit` characters.
///
/// Each cut prefers the last newline at or before `limit`, then the last
/// space, then a hard cut at `limit`. Leading whitespace of the remainder is
/// dropped before the next cut.
///
/// ```
/// use habla::reply::chunk;
///
/// assert_eq!(chunk("one two three", 8), vec!["one two", "three"]);
/// assert!(chunk("", 8).is_empty());
/// ```
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some((hard, c)) = rest.char_indices().nth(limit) {
        let window = &rest[..hard + c.len_utf8()];
        let cut = window
            .rfind('\n')
            .filter(|&i| i > 0)
            .or_else(|| window.rfind(' ').filter(|&i| i > 0))
            .unwrap_or(hard);
        parts.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}

/// Builds each logical reply as an ordered list of segments.
#[derive(Clone)]
pub struct ReplyFormatter {
    localizer: Localizer,
    limit: usize,
}

impl ReplyFormatter {
    pub fn new(localizer: Localizer, limit: usize) -> Self {
        Self { localizer, limit }
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn render(&self, to: &Sender, key: TemplateKey, vars: &[(&str, &str)]) -> String {
        self.localizer.localize(to.id, key, to.locale(), vars)
    }

    /// A single localized notice.
    pub fn notice(&self, to: &Sender, key: TemplateKey) -> Vec<String> {
        chunk(&self.render(to, key, &[]), self.limit)
    }

    pub fn transcription(&self, to: &Sender, t: &Transcription) -> Vec<String> {
        let conf = format!("{:.0}", t.confidence * 100.0);
        let header = self.render(
            to,
            TemplateKey::TranscriptionHeader,
            &[
                ("flag", flag_for(&t.language)),
                ("lang", &t.language),
                ("conf", &conf),
            ],
        );
        chunk(&(header + &t.text), self.limit)
    }

    pub fn you_wrote(&self, to: &Sender, lang: LanguageCode, text: &str) -> Vec<String> {
        let header = self.render(
            to,
            TemplateKey::YouWrote,
            &[("flag", flag_for(lang.as_str())), ("lang", lang.as_str())],
        );
        chunk(&(header + text), self.limit)
    }

    pub fn translation(&self, to: &Sender, source: &str, t: &Translation) -> Vec<String> {
        let target = t.target.as_str();
        let header = self.render(
            to,
            TemplateKey::TranslationHeader,
            &[("flag", flag_for(target)), ("src", source), ("tgt", target)],
        );
        chunk(&(header + &t.text), self.limit)
    }

    /// Emotion summary line; an empty list renders as neutral.
    pub fn emotions(&self, to: &Sender, scores: &[EmotionScore]) -> Vec<String> {
        let lang = self.localizer.ui_language(to.id, to.locale());
        let emo = format_emotions(scores, lang);
        chunk(
            &self.render(to, TemplateKey::EmotionHeader, &[("emo", &emo)]),
            self.limit,
        )
    }
}
