//! Reply reconciliation: fetch the assistant's answer for a history snapshot and merge it into the log.
//!
//! Remote failures never propagate; they become a fixed, user-visible reply. A reply identical to
//! the last assistant message is dropped so overlapping triggers cannot double-append a turn.

use crate::assistant::{AssistantBackend, AssistantError, ChatMessage};
use crate::session::{Message, Origin, SessionStore};

/// Shown when the assistant cannot be reached or answers with something unreadable.
pub const CONNECTION_ERROR_REPLY: &str = "Connection error: unable to reach assistant.";
/// Shown when the assistant answers without any text.
pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response.";

/// What happened to a reply once it resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Appended to the log.
    Appended,
    /// Identical to the last assistant message; not appended.
    Suppressed,
    /// Arrived after the controller was disposed; not appended.
    Discarded,
}

/// Ask the backend for a reply to `history`. Always yields display text.
pub async fn fetch_reply(backend: &dyn AssistantBackend, history: &[Message]) -> String {
    let messages: Vec<ChatMessage> = history.iter().map(ChatMessage::from).collect();
    match backend.chat(messages).await {
        Ok(res) => {
            let text = res.content().trim();
            if text.is_empty() {
                log::debug!("reconcile: empty reply, using fallback");
                EMPTY_REPLY.to_string()
            } else {
                text.to_string()
            }
        }
        Err(AssistantError::Api(e)) => {
            log::warn!("reconcile: assistant returned an error: {}", e);
            EMPTY_REPLY.to_string()
        }
        Err(e) => {
            log::warn!("reconcile: {}", e);
            CONNECTION_ERROR_REPLY.to_string()
        }
    }
}

/// Append `reply` unless it repeats the most recent assistant message (compared trimmed).
pub fn reconcile(session: &mut SessionStore, reply: Message) -> ReplyOutcome {
    let text = reply.text.trim();
    let repeats_last = session
        .last_from(Origin::Assistant)
        .map(|last| !text.is_empty() && last.text.trim() == text)
        .unwrap_or(false);
    if repeats_last {
        log::debug!("reconcile: suppressed duplicate assistant reply");
        return ReplyOutcome::Suppressed;
    }
    session.append(reply);
    ReplyOutcome::Appended
}
