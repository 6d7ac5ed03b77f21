//! Localized bot text.
//!
//! Templates are kept in `locales.toml`, embedded at compile time and checked
//! when the registry is built. The UI language for a user is resolved as:
//! stored preference, then the platform locale hint, then English.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tinytemplate::TinyTemplate;
use tracing::warn;

use crate::preferences::{PreferenceStore, UserId};

const LOCALES: &str = include_str!("locales.toml");

/// Language used for bot-generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiLanguage {
    En,
    Es,
}

impl UiLanguage {
    /// UI language implied by a platform locale such as `es-AR`.
    pub fn from_locale(locale: &str) -> Option<Self> {
        let locale = locale.trim().to_ascii_lowercase();
        if locale.starts_with("es") {
            Some(UiLanguage::Es)
        } else if locale.starts_with("en") {
            Some(UiLanguage::En)
        } else {
            None
        }
    }
}

/// Every piece of text the bot can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKey {
    Welcome,
    Help,
    About,
    ChooseLang,
    LangSet,
    UnknownCmd,
    NoTranscription,
    AnalysisSkipped,
    TranslationSkipped,
    TranscriptionHeader,
    EmotionHeader,
    YouWrote,
    TranslationHeader,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 13] = [
        TemplateKey::Welcome,
        TemplateKey::Help,
        TemplateKey::About,
        TemplateKey::ChooseLang,
        TemplateKey::LangSet,
        TemplateKey::UnknownCmd,
        TemplateKey::NoTranscription,
        TemplateKey::AnalysisSkipped,
        TemplateKey::TranslationSkipped,
        TemplateKey::TranscriptionHeader,
        TemplateKey::EmotionHeader,
        TemplateKey::YouWrote,
        TemplateKey::TranslationHeader,
    ];

    /// Table name in `locales.toml`.
    pub fn name(&self) -> &'static str {
        match self {
            TemplateKey::Welcome => "welcome",
            TemplateKey::Help => "help",
            TemplateKey::About => "about",
            TemplateKey::ChooseLang => "choose_lang",
            TemplateKey::LangSet => "lang_set",
            TemplateKey::UnknownCmd => "unknown_cmd",
            TemplateKey::NoTranscription => "no_transcription",
            TemplateKey::AnalysisSkipped => "analysis_skipped",
            TemplateKey::TranslationSkipped => "translation_skipped",
            TemplateKey::TranscriptionHeader => "transcription_header",
            TemplateKey::EmotionHeader => "emotion_header",
            TemplateKey::YouWrote => "you_wrote",
            TemplateKey::TranslationHeader => "translation_header",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Variants {
    en: Option<String>,
    es: Option<String>,
}

impl Variants {
    fn get(&self, lang: UiLanguage) -> Option<&str> {
        match lang {
            UiLanguage::En => self.en.as_deref(),
            UiLanguage::Es => self.es.as_deref(),
        }
    }
}

/// Typed `(key, language) → template` registry.
#[derive(Debug, Clone)]
pub struct Templates {
    entries: HashMap<TemplateKey, Variants>,
}

impl Templates {
    /// Registry built from the embedded `locales.toml`.
    pub fn embedded() -> anyhow::Result<Self> {
        let templates = Self::from_toml(LOCALES)?;
        templates.validate()?;
        Ok(templates)
    }

    /// Parse a registry without validating completeness.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, Variants> = toml::from_str(text)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (name, variants) in raw {
            let Some(key) = TemplateKey::from_name(&name) else {
                anyhow::bail!("unknown template {name:?}");
            };
            entries.insert(key, variants);
        }
        Ok(Self { entries })
    }

    /// Every key must have an English variant and every variant must parse.
    pub fn validate(&self) -> anyhow::Result<()> {
        for key in TemplateKey::ALL {
            let Some(variants) = self.entries.get(&key) else {
                anyhow::bail!("template {key:?} is missing");
            };
            if variants.en.is_none() {
                anyhow::bail!("template {key:?} has no English variant");
            }
            for text in [&variants.en, &variants.es].into_iter().flatten() {
                let mut tt = TinyTemplate::new();
                tt.add_template("tpl", text)
                    .map_err(|e| anyhow::anyhow!("template {key:?} does not parse: {e}"))?;
            }
        }
        Ok(())
    }

    /// Render `key` in `lang`, falling back to English and then to an empty
    /// string. A template that fails to render also yields an empty string;
    /// the failure is logged, never raised.
    pub fn render(&self, key: TemplateKey, lang: UiLanguage, vars: &[(&str, &str)]) -> String {
        let Some(variants) = self.entries.get(&key) else {
            return String::new();
        };
        let Some(template) = variants.get(lang).or_else(|| variants.get(UiLanguage::En)) else {
            return String::new();
        };
        let ctx: BTreeMap<&str, &str> = vars.iter().copied().collect();
        let mut tt = TinyTemplate::new();
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        let rendered = tt
            .add_template("tpl", template)
            .and_then(|_| tt.render("tpl", &ctx));
        match rendered {
            Ok(text) => text,
            Err(e) => {
                warn!(?key, ?lang, %e, "template render failed");
                String::new()
            }
        }
    }
}

/// Resolves the UI language per user and renders templates in it.
#[derive(Clone)]
pub struct Localizer {
    templates: Arc<Templates>,
    prefs: Arc<dyn PreferenceStore>,
}

impl Localizer {
    pub fn new(templates: Arc<Templates>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { templates, prefs }
    }

    pub fn ui_language(&self, user: UserId, locale_hint: Option<&str>) -> UiLanguage {
        self.prefs
            .get(user)
            .or_else(|| locale_hint.and_then(UiLanguage::from_locale))
            .unwrap_or(UiLanguage::En)
    }

    pub fn localize(
        &self,
        user: UserId,
        key: TemplateKey,
        locale_hint: Option<&str>,
        vars: &[(&str, &str)],
    ) -> String {
        let lang = self.ui_language(user, locale_hint);
        self.templates.render(key, lang, vars)
    }

    /// Store an explicit UI language choice for `user`.
    pub fn set_language(&self, user: UserId, lang: UiLanguage) {
        self.prefs.set(user, lang);
    }
}
