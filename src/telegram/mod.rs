//! Telegram transport: long polling, update dispatch and reply delivery.

mod client;
pub mod types;

pub use client::Client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::commands::{self, Choice, Command};
use crate::message::{Message, Sender};
use crate::pipeline::{Outbox, Pipeline};
use crate::reply::chunk;
use types::{CallbackQuery, ChatMessage, Update};

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// [`Outbox`] writing to one chat.
pub struct ChatOutbox {
    client: Client,
    chat_id: i64,
}

impl ChatOutbox {
    pub fn new(client: Client, chat_id: i64) -> Self {
        Self { client, chat_id }
    }
}

#[async_trait]
impl Outbox for ChatOutbox {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.client.send_message(self.chat_id, text, &[]).await?;
        Ok(())
    }
}

/// Routes updates to commands, the language selector or the pipeline.
pub struct Bot {
    client: Client,
    pipeline: Pipeline,
}

impl Bot {
    pub fn new(client: Client, pipeline: Pipeline) -> Self {
        Self { client, pipeline }
    }

    pub async fn handle_update(&self, update: Update) -> anyhow::Result<()> {
        if let Some(query) = update.callback_query {
            return self.on_callback(query).await;
        }
        let Some(msg) = update.message else {
            debug!(update_id = update.update_id, "ignoring update");
            return Ok(());
        };
        let from = sender_of(&msg);
        if let Some(voice) = &msg.voice {
            debug!(user_id = from.id, duration = voice.duration, "voice message");
            let file = self.client.get_file(&voice.file_id).await?;
            let audio = self.client.download(&file).await?;
            let outbox = ChatOutbox::new(self.client.clone(), msg.chat.id);
            self.pipeline
                .handle_guarded(&Message::voice(from, audio), &outbox)
                .await;
            return Ok(());
        }
        let Some(text) = msg.text.as_deref() else {
            return Ok(());
        };
        if let Some(cmd) = Command::parse(text) {
            return self.on_command(&cmd, &from, msg.chat.id).await;
        }
        let outbox = ChatOutbox::new(self.client.clone(), msg.chat.id);
        self.pipeline
            .handle_guarded(&Message::text(from, text), &outbox)
            .await;
        Ok(())
    }

    async fn on_command(&self, cmd: &Command, from: &Sender, chat_id: i64) -> anyhow::Result<()> {
        debug!(user_id = from.id, ?cmd, "command");
        let formatter = self.pipeline.formatter();
        let reply = commands::respond(cmd, formatter.localizer(), from);
        let segments = chunk(&reply.text, formatter.limit());
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            let choices: &[Choice] = if i == last { reply.choices.as_slice() } else { &[] };
            self.client.send_message(chat_id, segment, choices).await?;
        }
        Ok(())
    }

    async fn on_callback(&self, query: CallbackQuery) -> anyhow::Result<()> {
        self.client.answer_callback_query(&query.id).await?;
        let from = Sender::new(query.from.id, query.from.language_code.clone());
        let Some(data) = query.data.as_deref() else {
            return Ok(());
        };
        let localizer = self.pipeline.formatter().localizer();
        let Some(confirmation) = commands::select_language(localizer, &from, data) else {
            debug!(user_id = from.id, data, "ignoring callback");
            return Ok(());
        };
        info!(user_id = from.id, data, "ui language changed");
        if let Some(prompt) = &query.message {
            self.client
                .edit_message_text(prompt.chat.id, prompt.message_id, &confirmation)
                .await?;
        }
        Ok(())
    }
}

fn sender_of(msg: &ChatMessage) -> Sender {
    match &msg.from {
        Some(user) => Sender::new(user.id, user.language_code.clone()),
        None => Sender::new(msg.chat.id, None::<String>),
    }
}

/// Poll for updates until `shutdown` resolves, handling each update on its
/// own task.
///
/// Once `shutdown` fires no new updates are accepted, but updates already
/// in flight run to completion before this returns.
pub async fn run<F>(bot: Arc<Bot>, wait: Duration, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()>,
{
    info!("polling for updates");
    tokio::pin!(shutdown);
    let mut offset: Option<i64> = None;
    let mut tasks = JoinSet::new();
    loop {
        while tasks.try_join_next().is_some() {}
        let updates = tokio::select! {
            _ = &mut shutdown => break,
            res = bot.client.get_updates(offset, wait) => res,
        };
        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let bot = bot.clone();
                    tasks.spawn(async move {
                        let id = update.update_id;
                        if let Err(e) = bot.handle_update(update).await {
                            error!(update_id = id, error = ?e, "update handling failed");
                        }
                    });
                }
            }
            Err(e) => {
                warn!(error = ?e, "getUpdates failed; retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
    info!(pending = tasks.len(), "stopping; draining in-flight updates");
    while tasks.join_next().await.is_some() {}
    Ok(())
}
