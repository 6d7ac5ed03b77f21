use clap::Parser;

use crate::logging::LogLevel;

/// Command line arguments for the habla binary.
#[derive(Parser, Clone, Debug)]
#[command(version, about = "Voice and text translation bot for English and Spanish")]
pub struct Args {
    /// Bot API token.
    #[arg(long = "telegram-token", env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: String,
    #[arg(
        long = "telegram-api-url",
        env = "TELEGRAM_API_URL",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_url: String,
    /// faster-whisper service.
    #[arg(long = "asr-url", env = "ASR_URL", default_value = "http://localhost:9000")]
    pub asr_url: String,
    /// MarianMT en↔es service.
    #[arg(
        long = "translate-url",
        env = "TRANSLATE_URL",
        default_value = "http://localhost:9001"
    )]
    pub translate_url: String,
    /// text-embeddings-inference instance serving a GoEmotions model.
    #[arg(
        long = "emotion-url",
        env = "EMOTION_URL",
        default_value = "http://localhost:9002"
    )]
    pub emotion_url: String,
    #[arg(long = "capability-timeout-ms", default_value_t = 60_000)]
    pub capability_timeout_ms: u64,
    /// Maximum characters per outbound message.
    #[arg(long = "max-message-len", default_value_t = 4096, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_message_len: u32,
    #[arg(long = "poll-timeout-secs", default_value_t = 30)]
    pub poll_timeout_secs: u64,
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Args {
    pub fn capability_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.capability_timeout_ms)
    }

    pub fn poll_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_timeout_secs)
    }
}
