use crate::preferences::UserId;

/// Who sent a message and which locale their client reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub locale: Option<String>,
}

impl Sender {
    pub fn new(id: UserId, locale: Option<impl Into<String>>) -> Self {
        Self {
            id,
            locale: locale.map(Into::into),
        }
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Encoded audio clip as delivered by the transport.
    Voice(Vec<u8>),
    Text(String),
}

/// One inbound unit, discarded once the pipeline has finished with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub payload: Payload,
}

impl Message {
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn voice(sender: Sender, audio: Vec<u8>) -> Self {
        Self {
            sender,
            payload: Payload::Voice(audio),
        }
    }

    pub fn modality(&self) -> &'static str {
        match self.payload {
            Payload::Voice(_) => "voice",
            Payload::Text(_) => "text",
        }
    }
}
