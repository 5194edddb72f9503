use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::platform::{AlertSink, ChatKind, IncomingMessage, MediaKind, MessageContent, Sender};
use crate::tracker::Tracker;

/// Sends alerts through the Bot API
pub struct TelegramAlertSink {
    bot: Bot,
}

impl TelegramAlertSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl AlertSink for TelegramAlertSink {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(())
    }
}

/// Run the Telegram platform (long polling) until the dispatcher stops
pub async fn run(bot: Bot, tracker: Arc<Tracker>) -> Result<()> {
    // A leftover webhook makes getUpdates fail with 409 Conflict.
    bot.delete_webhook()
        .drop_pending_updates(true)
        .await
        .context("Failed to delete webhook")?;

    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![tracker])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, tracker: Arc<Tracker>) -> ResponseResult<()> {
    if msg.text().is_some_and(is_chat_id_command) {
        info!("Chat info requested in chat {}", msg.chat.id);
        bot.send_message(msg.chat.id, describe_chat(&msg)).await?;
        return Ok(());
    }

    let Some(incoming) = incoming_from_telegram(&msg) else {
        return Ok(());
    };

    tracker.handle_incoming_message(&incoming).await;
    Ok(())
}

/// `/chatid` or `/chatid@SomeBot`, optionally followed by arguments
fn is_chat_id_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    let name = command.split('@').next().unwrap_or_default();
    name.eq_ignore_ascii_case("/chatid")
}

fn describe_chat(msg: &Message) -> String {
    format!(
        "Chat ID: {}\nType: {}\nTitle: {}",
        msg.chat.id,
        chat_kind(&msg.chat),
        msg.chat.title().unwrap_or("-")
    )
}

fn chat_kind(chat: &teloxide::types::Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_group() {
        ChatKind::Group
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else {
        ChatKind::Channel
    }
}

/// Normalize a Telegram message. `None` when there is no user sender.
pub fn incoming_from_telegram(msg: &Message) -> Option<IncomingMessage> {
    let user = msg.from.as_ref()?;

    Some(IncomingMessage {
        chat_id: msg.chat.id.0,
        chat_kind: chat_kind(&msg.chat),
        chat_title: msg.chat.title().map(str::to_string),
        sender: Sender {
            id: user.id.0,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            is_bot: user.is_bot,
        },
        content: classify_content(msg),
    })
}

fn classify_content(msg: &Message) -> MessageContent {
    if let Some(text) = msg.text() {
        return MessageContent::Text(text.to_string());
    }
    if let Some(caption) = msg.caption() {
        return MessageContent::Caption(caption.to_string());
    }

    let kind = if msg.photo().is_some() {
        MediaKind::Photo
    } else if msg.video().is_some() {
        MediaKind::Video
    } else if msg.document().is_some() {
        MediaKind::Document
    } else if msg.voice().is_some() {
        MediaKind::Voice
    } else if msg.sticker().is_some() {
        MediaKind::Sticker
    } else if msg.audio().is_some()
        || msg.animation().is_some()
        || msg.video_note().is_some()
        || msg.contact().is_some()
        || msg.location().is_some()
        || msg.venue().is_some()
        || msg.poll().is_some()
        || msg.dice().is_some()
    {
        MediaKind::Other
    } else {
        return MessageContent::SystemEvent;
    };

    MessageContent::Media(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    fn supergroup() -> serde_json::Value {
        json!({"id": -200111, "title": "Support", "type": "supergroup"})
    }

    fn alice() -> serde_json::Value {
        json!({"id": 42, "is_bot": false, "first_name": "Alice", "username": "alice"})
    }

    #[test]
    fn test_text_message_in_supergroup() {
        let msg = parse(json!({
            "message_id": 1,
            "date": 1700000000,
            "chat": supergroup(),
            "from": alice(),
            "text": "anyone here?"
        }));

        let incoming = incoming_from_telegram(&msg).unwrap();
        assert_eq!(incoming.chat_id, -200111);
        assert_eq!(incoming.chat_kind, ChatKind::Supergroup);
        assert_eq!(incoming.chat_title.as_deref(), Some("Support"));
        assert_eq!(incoming.sender.id, 42);
        assert_eq!(incoming.sender.username.as_deref(), Some("alice"));
        assert!(!incoming.sender.is_bot);
        assert_eq!(incoming.content, MessageContent::Text("anyone here?".into()));
    }

    #[test]
    fn test_photo_with_caption_uses_caption() {
        let msg = parse(json!({
            "message_id": 2,
            "date": 1700000000,
            "chat": supergroup(),
            "from": alice(),
            "photo": [{"file_id": "f", "file_unique_id": "u", "width": 10, "height": 10, "file_size": 100}],
            "caption": "is this broken?"
        }));

        let incoming = incoming_from_telegram(&msg).unwrap();
        assert_eq!(incoming.content, MessageContent::Caption("is this broken?".into()));
    }

    #[test]
    fn test_photo_without_caption() {
        let msg = parse(json!({
            "message_id": 3,
            "date": 1700000000,
            "chat": supergroup(),
            "from": alice(),
            "photo": [{"file_id": "f", "file_unique_id": "u", "width": 10, "height": 10, "file_size": 100}]
        }));

        let incoming = incoming_from_telegram(&msg).unwrap();
        assert_eq!(incoming.content, MessageContent::Media(MediaKind::Photo));
    }

    #[test]
    fn test_private_chat_kind() {
        let msg = parse(json!({
            "message_id": 4,
            "date": 1700000000,
            "chat": {"id": 42, "first_name": "Alice", "type": "private"},
            "from": alice(),
            "text": "hi"
        }));

        let incoming = incoming_from_telegram(&msg).unwrap();
        assert_eq!(incoming.chat_kind, ChatKind::Private);
        assert!(incoming.chat_title.is_none());
    }

    #[test]
    fn test_member_left_is_system_event() {
        let msg = parse(json!({
            "message_id": 5,
            "date": 1700000000,
            "chat": {"id": -300, "title": "Old group", "type": "group"},
            "from": alice(),
            "left_chat_member": alice()
        }));

        let incoming = incoming_from_telegram(&msg).unwrap();
        assert_eq!(incoming.chat_kind, ChatKind::Group);
        assert_eq!(incoming.content, MessageContent::SystemEvent);
    }

    #[test]
    fn test_chat_id_command_detection() {
        assert!(is_chat_id_command("/chatid"));
        assert!(is_chat_id_command("/chatid@ReminderBot"));
        assert!(is_chat_id_command("/ChatId please"));
        assert!(!is_chat_id_command("/chatids"));
        assert!(!is_chat_id_command("what is the /chatid"));
        assert!(!is_chat_id_command(""));
    }
}
