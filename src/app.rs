use std::sync::Arc;

use tracing::info;

use crate::args::Args;
use crate::emotion::{EmotionClassifier, HttpEmotionModel};
use crate::i18n::{Localizer, Templates};
use crate::language_id::LanguageIdentifier;
use crate::pipeline::Pipeline;
use crate::preferences::InMemoryPreferences;
use crate::reply::ReplyFormatter;
use crate::shutdown::shutdown_signal;
use crate::telegram::{self, Bot, Client};
use crate::transcriber::HttpTranscriber;
use crate::translator::{HttpTranslationBackend, Translator};

/// Construct every long-lived service once and wire them into a [`Pipeline`].
///
/// Fails when the embedded templates are incomplete.
pub fn build_pipeline(args: &Args, http: reqwest::Client) -> anyhow::Result<Pipeline> {
    let templates = Arc::new(Templates::embedded()?);
    let localizer = Localizer::new(templates, Arc::new(InMemoryPreferences::new()));
    let timeout = args.capability_timeout();
    let transcriber = HttpTranscriber::new(http.clone(), &args.asr_url, timeout);
    let translator = Translator::new(
        Arc::new(HttpTranslationBackend::new(http.clone(), &args.translate_url)),
        timeout,
    );
    let emotions = EmotionClassifier::new(
        Arc::new(HttpEmotionModel::new(http, &args.emotion_url)),
        timeout,
    );
    Ok(Pipeline::new(
        Arc::new(LanguageIdentifier::standard()),
        Arc::new(transcriber),
        translator,
        emotions,
        ReplyFormatter::new(localizer, args.max_message_len as usize),
    ))
}

/// Run the bot until Ctrl+C or SIGTERM.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let pipeline = build_pipeline(&args, http.clone())?;
    let client = Client::new(http, &args.telegram_api_url, &args.telegram_token);
    info!(
        asr = %args.asr_url,
        translate = %args.translate_url,
        emotion = %args.emotion_url,
        limit = args.max_message_len,
        "habla starting"
    );
    let bot = Arc::new(Bot::new(client, pipeline));
    telegram::run(bot, args.poll_timeout(), shutdown_signal()).await
}
