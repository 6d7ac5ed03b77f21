use serde::{Deserialize, Serialize};

/// Language of a message as far as the pipeline cares.
///
/// Only [`LanguageCode::En`] and [`LanguageCode::Es`] are eligible for
/// translation and emotion analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    En,
    Es,
    Other,
}

impl LanguageCode {
    /// Classify a raw language code by its two-letter prefix.
    ///
    /// ```
    /// use habla::LanguageCode;
    ///
    /// assert_eq!(LanguageCode::from_prefix("en-US"), LanguageCode::En);
    /// assert_eq!(LanguageCode::from_prefix("ES"), LanguageCode::Es);
    /// assert_eq!(LanguageCode::from_prefix("fr"), LanguageCode::Other);
    /// ```
    pub fn from_prefix(code: &str) -> Self {
        let code = code.trim().to_ascii_lowercase();
        if code.starts_with("en") {
            LanguageCode::En
        } else if code.starts_with("es") {
            LanguageCode::Es
        } else {
            LanguageCode::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Es => "es",
            LanguageCode::Other => "other",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, LanguageCode::Other)
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flag emoji shown next to a raw language code.
pub fn flag_for(code: &str) -> &'static str {
    match LanguageCode::from_prefix(code) {
        LanguageCode::En => "🇬🇧",
        LanguageCode::Es => "🇪🇸",
        LanguageCode::Other => "🌐",
    }
}
