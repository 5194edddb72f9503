pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Kind of conversation a message arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Multi-member conversations are the only ones monitored.
    pub fn is_group_like(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatKind::Private => write!(f, "private"),
            ChatKind::Group => write!(f, "group"),
            ChatKind::Supergroup => write!(f, "supergroup"),
            ChatKind::Channel => write!(f, "channel"),
        }
    }
}

/// Author of a message
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: u64,
    /// Handle without the leading '@'
    pub username: Option<String>,
    pub first_name: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Voice,
    Sticker,
    /// User content without a dedicated label (audio, location, poll, ...)
    Other,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Photo => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "file",
            MediaKind::Voice => "voice",
            MediaKind::Sticker => "sticker",
            MediaKind::Other => "non-text message",
        }
    }
}

/// Message payload, classified once at the platform boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Caption(String),
    Media(MediaKind),
    /// Join/leave/pin notices and other service messages
    SystemEvent,
}

impl MessageContent {
    pub fn is_substantive(&self) -> bool {
        !matches!(self, MessageContent::SystemEvent)
    }
}

/// A message received from the chat platform, normalized
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub chat_title: Option<String>,
    pub sender: Sender,
    pub content: MessageContent,
}

/// Outbound side of the platform used for alerts.
///
/// Errors are reported to the caller and never retried here.
#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;
}
