//! Conversation session: ordered message log plus the panel visibility flag.
//!
//! Both are restored from a [`KeyValueStore`] on load and written back on every change.
//! Persistence is best effort: storage failures are logged and never block the conversation.

use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Who produced a message. Persisted as "user" / "bot" to stay readable by the web widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "bot", alias = "assistant")]
    Assistant,
}

impl Origin {
    /// Role name on the chat wire format.
    pub fn role(self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::Assistant => "assistant",
        }
    }
}

/// A single exchanged utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "from")]
    pub origin: Origin,
    pub text: String,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(rename = "time")]
    pub timestamp: i64,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            text: text.into(),
            timestamp: now_millis(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Assistant,
            text: text.into(),
            timestamp: now_millis(),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Storage keys for the two persisted entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub history: String,
    pub visibility: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            history: crate::config::DEFAULT_HISTORY_KEY.to_string(),
            visibility: crate::config::DEFAULT_VISIBILITY_KEY.to_string(),
        }
    }
}

impl From<&crate::config::StorageConfig> for StorageKeys {
    fn from(c: &crate::config::StorageConfig) -> Self {
        Self {
            history: c.history_key.clone(),
            visibility: c.visibility_key.clone(),
        }
    }
}

const VISIBLE: &str = "1";
const HIDDEN: &str = "0";

/// Durable, append-only message log and visibility flag.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    messages: Vec<Message>,
    visible: bool,
}

impl SessionStore {
    /// Restore the session from `storage`. A missing or malformed log yields an empty log;
    /// a missing visibility entry yields hidden.
    pub fn load(storage: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        let messages = match storage.get(&keys.history) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<Message>>(&raw).unwrap_or_else(|e| {
                log::debug!("session: discarding unreadable message log: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::debug!("session: message log unavailable: {}", e);
                Vec::new()
            }
        };
        let visible = match storage.get(&keys.visibility) {
            Ok(v) => v.as_deref() == Some(VISIBLE),
            Err(e) => {
                log::debug!("session: visibility flag unavailable: {}", e);
                false
            }
        };
        log::debug!(
            "session: restored {} messages, visible={}",
            messages.len(),
            visible
        );
        Self {
            storage,
            keys,
            messages,
            visible,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Most recent message from `origin`, if any.
    pub fn last_from(&self, origin: Origin) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.origin == origin)
    }

    /// Append to the end of the log, persist the whole log, and return the updated history.
    /// Timestamps never go backwards: a message stamped earlier than its predecessor takes the predecessor's time.
    pub fn append(&mut self, mut message: Message) -> Vec<Message> {
        if let Some(last) = self.messages.last() {
            message.timestamp = message.timestamp.max(last.timestamp);
        }
        self.messages.push(message);
        self.persist_messages();
        self.messages.clone()
    }

    /// Empty the log and drop its persisted entry. Visibility is untouched.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.storage.remove(&self.keys.history) {
            log::warn!("session: failed to remove message log: {}", e);
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        let flag = if visible { VISIBLE } else { HIDDEN };
        if let Err(e) = self.storage.set(&self.keys.visibility, flag) {
            log::warn!("session: failed to persist visibility: {}", e);
        }
    }

    /// Flip visibility and return the new value.
    pub fn toggle(&mut self) -> bool {
        let visible = !self.visible;
        self.set_visible(visible);
        visible
    }

    fn persist_messages(&self) {
        let json = match serde_json::to_string(&self.messages) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("session: failed to encode message log: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.keys.history, &json) {
            log::warn!("session: failed to persist message log: {}", e);
        }
    }
}
