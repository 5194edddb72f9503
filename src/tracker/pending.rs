use tokio::task::AbortHandle;

use crate::platform::{IncomingMessage, MediaKind, MessageContent, Sender};

const UNKNOWN_USER: &str = "unknown user";
const UNKNOWN_CHAT: &str = "unknown chat";
const TRUNCATION_MARKER: char = '…';

/// An unanswered message with its armed deadline timer.
///
/// Owns the timer: the only ways out are [`PendingQuestion::cancel`] (reply
/// arrived) or being taken by the timer itself when it fires.
pub struct PendingQuestion {
    pub asker_id: u64,
    pub asker_name: String,
    pub preview: String,
    pub chat_title: String,
    pub(super) ticket: u64,
    timer: AbortHandle,
}

impl PendingQuestion {
    pub fn new(msg: &IncomingMessage, preview_max_chars: usize, ticket: u64, timer: AbortHandle) -> Self {
        Self {
            asker_id: msg.sender.id,
            asker_name: display_name(&msg.sender),
            preview: content_preview(&msg.content, preview_max_chars),
            chat_title: chat_title(msg.chat_title.as_deref()),
            ticket,
            timer,
        }
    }

    /// Stop the deadline timer. Consumes the entry so the handle can't be reused.
    pub fn cancel(self) {
        self.timer.abort();
    }
}

/// `@username`, else first name, else a placeholder
pub fn display_name(sender: &Sender) -> String {
    match sender.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => format!("@{}", username),
        _ => {
            let first_name = sender.first_name.trim();
            if first_name.is_empty() {
                UNKNOWN_USER.to_string()
            } else {
                first_name.to_string()
            }
        }
    }
}

pub fn chat_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => UNKNOWN_CHAT.to_string(),
    }
}

/// Bounded one-line summary of a message for the alert text
pub fn content_preview(content: &MessageContent, max_chars: usize) -> String {
    match content {
        MessageContent::Text(text) | MessageContent::Caption(text) => {
            if text.trim().is_empty() {
                MediaKind::Other.label().to_string()
            } else {
                truncate_chars(text, max_chars)
            }
        }
        MessageContent::Media(kind) => kind.label().to_string(),
        MessageContent::SystemEvent => MediaKind::Other.label().to_string(),
    }
}

// Counts chars, not bytes, so multi-byte text is never split mid-character.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut out = text[..cut].to_string();
            out.push(TRUNCATION_MARKER);
            out
        }
    }
}
