pub mod alert;
pub mod pending;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

use crate::config::ReminderConfig;
use crate::platform::{AlertSink, IncomingMessage, Sender};
use crate::tracker::pending::PendingQuestion;

type PendingMap = Arc<Mutex<HashMap<i64, PendingQuestion>>>;

/// Runtime view of the `[reminder]` config section
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub alert_chat_id: i64,
    pub reply_timeout: Duration,
    pub privileged_user_ids: HashSet<u64>,
    /// Lowercased, without '@'
    pub privileged_usernames: HashSet<String>,
    pub preview_max_chars: usize,
}

impl From<&ReminderConfig> for TrackerSettings {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            alert_chat_id: config.alert_chat_id,
            reply_timeout: Duration::from_secs(config.reply_timeout_secs),
            privileged_user_ids: config.privileged_user_ids.iter().copied().collect(),
            privileged_usernames: config
                .privileged_usernames
                .iter()
                .map(|name| normalize_username(name))
                .filter(|name| !name.is_empty())
                .collect(),
            preview_max_chars: config.preview_max_chars,
        }
    }
}

impl TrackerSettings {
    fn is_privileged(&self, sender: &Sender) -> bool {
        if self.privileged_user_ids.contains(&sender.id) {
            return true;
        }
        sender
            .username
            .as_deref()
            .map(|name| self.privileged_usernames.contains(&normalize_username(name)))
            .unwrap_or(false)
    }
}

fn normalize_username(name: &str) -> String {
    name.trim().trim_start_matches('@').to_lowercase()
}

/// Why a message was not considered at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotGroup,
    FromBot,
    AlertChat,
    SystemEvent,
}

/// What handling one message did to the chat's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    /// A pending question existed and was resolved by this message.
    Answered,
    /// No pending question, and the sender is exempt from starting one.
    Privileged,
    /// A new pending question was created and its timer armed.
    Started,
}

/// Tracks at most one unanswered question per chat and raises an alert
/// when nobody speaks before the deadline.
pub struct Tracker {
    settings: TrackerSettings,
    sink: Arc<dyn AlertSink>,
    pending: PendingMap,
    next_ticket: AtomicU64,
}

impl Tracker {
    pub fn new(settings: TrackerSettings, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            settings,
            sink,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Apply one inbound message to the chat's state.
    ///
    /// Any eligible message resolves a pending question, whoever sends it.
    /// Otherwise a non-privileged sender starts a new one. The lookup and
    /// the resulting insert/remove happen under a single lock.
    pub async fn handle_incoming_message(&self, msg: &IncomingMessage) -> Outcome {
        if let Some(reason) = self.ineligibility(msg) {
            debug!("Ignoring message in chat {}: {:?}", msg.chat_id, reason);
            return Outcome::Ignored(reason);
        }

        let mut pending = self.pending.lock().await;

        if let Some(question) = pending.remove(&msg.chat_id) {
            info!(
                "Question from {} in chat {} answered by user {}",
                question.asker_name, msg.chat_id, msg.sender.id
            );
            question.cancel();
            return Outcome::Answered;
        }

        if self.settings.is_privileged(&msg.sender) {
            debug!(
                "Privileged user {} in chat {}, no timer started",
                msg.sender.id, msg.chat_id
            );
            return Outcome::Privileged;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let timer = self.arm_timer(msg.chat_id, ticket);
        let question = PendingQuestion::new(msg, self.settings.preview_max_chars, ticket, timer);

        info!(
            "Waiting {}s for a reply to {} in chat {} ({})",
            self.settings.reply_timeout.as_secs(),
            question.asker_name,
            msg.chat_id,
            question.chat_title
        );
        pending.insert(msg.chat_id, question);

        Outcome::Started
    }

    fn ineligibility(&self, msg: &IncomingMessage) -> Option<IgnoreReason> {
        if !msg.chat_kind.is_group_like() {
            Some(IgnoreReason::NotGroup)
        } else if msg.sender.is_bot {
            Some(IgnoreReason::FromBot)
        } else if msg.chat_id == self.settings.alert_chat_id {
            Some(IgnoreReason::AlertChat)
        } else if !msg.content.is_substantive() {
            Some(IgnoreReason::SystemEvent)
        } else {
            None
        }
    }

    // Called with the map locked, so the task can't observe the map before
    // the entry holding its handle is inserted.
    fn arm_timer(&self, chat_id: i64, ticket: u64) -> AbortHandle {
        let pending = Arc::clone(&self.pending);
        let sink = Arc::clone(&self.sink);
        let alert_chat_id = self.settings.alert_chat_id;
        let timeout = self.settings.reply_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            fire(pending, sink, alert_chat_id, timeout, chat_id, ticket).await;
        })
        .abort_handle()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    #[allow(dead_code)]
    pub async fn is_pending(&self, chat_id: i64) -> bool {
        self.pending.lock().await.contains_key(&chat_id)
    }

    /// Disarm every timer and forget all pending questions.
    pub async fn shutdown(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        for (_, question) in pending.drain() {
            question.cancel();
        }
        count
    }
}

/// Deadline reached: take the entry (if it is still ours) and send the alert.
///
/// The entry is removed before sending, so a slow or failed delivery never
/// leaves it behind. Delivery errors are logged and not retried.
async fn fire(
    pending: PendingMap,
    sink: Arc<dyn AlertSink>,
    alert_chat_id: i64,
    timeout: Duration,
    chat_id: i64,
    ticket: u64,
) {
    let question = {
        let mut pending = pending.lock().await;
        if pending.get(&chat_id).map(|q| q.ticket) == Some(ticket) {
            pending.remove(&chat_id)
        } else {
            None
        }
    };

    let Some(question) = question else {
        debug!("Stale timer for chat {} ignored", chat_id);
        return;
    };

    let text = alert::format_alert(&question, timeout);
    info!(
        "No reply to {} ({}) in chat {} after {}s, alerting chat {}",
        question.asker_name,
        question.asker_id,
        chat_id,
        timeout.as_secs(),
        alert_chat_id
    );

    if let Err(e) = sink.send_text(alert_chat_id, &text).await {
        error!("Failed to deliver alert for chat {}: {:#}", chat_id, e);
    }
}
