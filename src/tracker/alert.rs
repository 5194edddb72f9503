use std::time::Duration;

use super::pending::PendingQuestion;

/// Render the timeout notification sent to the alert chat.
pub fn format_alert(question: &PendingQuestion, timeout: Duration) -> String {
    render(
        &question.chat_title,
        &question.asker_name,
        &question.preview,
        timeout.as_secs(),
    )
}

fn render(chat_title: &str, asker_name: &str, preview: &str, secs: u64) -> String {
    format!(
        "⚠️ No reply within {}s\nChat: {}\nUser: {}\nMessage: {}",
        secs, chat_title, asker_name, preview
    )
}
