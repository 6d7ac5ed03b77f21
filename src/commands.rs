//! Bot commands and the UI language selector. Commands never reach the
//! pipeline.

use crate::i18n::{Localizer, TemplateKey, UiLanguage};
use crate::message::Sender;

const SETLANG_PREFIX: &str = "setlang:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    About,
    Lang,
    Unknown(String),
}

impl Command {
    /// Parse a `/command` or `/command@botname`; `None` for plain text.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim_start().strip_prefix('/')?.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("").to_ascii_lowercase();
        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "about" => Command::About,
            "lang" => Command::Lang,
            _ => Command::Unknown(name),
        })
    }
}

/// One button of an option prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub label: &'static str,
    pub data: &'static str,
}

pub const LANGUAGE_CHOICES: [Choice; 2] = [
    Choice {
        label: "🇪🇸 Español",
        data: "setlang:es",
    },
    Choice {
        label: "🇬🇧 English",
        data: "setlang:en",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub choices: Vec<Choice>,
}

impl CommandReply {
    fn plain(text: String) -> Self {
        Self {
            text,
            choices: Vec::new(),
        }
    }
}

pub fn respond(cmd: &Command, localizer: &Localizer, from: &Sender) -> CommandReply {
    let render = |key| localizer.localize(from.id, key, from.locale(), &[]);
    match cmd {
        Command::Start => CommandReply::plain(render(TemplateKey::Welcome)),
        Command::Help => CommandReply::plain(render(TemplateKey::Help)),
        Command::About => CommandReply::plain(render(TemplateKey::About)),
        Command::Lang => CommandReply {
            text: render(TemplateKey::ChooseLang),
            choices: LANGUAGE_CHOICES.to_vec(),
        },
        Command::Unknown(_) => CommandReply::plain(render(TemplateKey::UnknownCmd)),
    }
}

/// Language named by `setlang:<code>` callback data.
pub fn parse_selection(data: &str) -> Option<UiLanguage> {
    match data.strip_prefix(SETLANG_PREFIX)? {
        "es" => Some(UiLanguage::Es),
        "en" => Some(UiLanguage::En),
        _ => None,
    }
}

/// Store the selected UI language and return the confirmation, rendered in
/// that language. `None` if `data` is not a language selection.
pub fn select_language(localizer: &Localizer, from: &Sender, data: &str) -> Option<String> {
    let lang = parse_selection(data)?;
    localizer.set_language(from.id, lang);
    Some(localizer.localize(from.id, TemplateKey::LangSet, from.locale(), &[]))
}
