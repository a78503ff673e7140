//! Chat controller: owns the session, gates sends, and merges replies.
//!
//! One controller is one mounted chat widget. Sends are accepted only when the input is non-empty,
//! no reply is outstanding, the assistant is ready, the debounce window is closed, and the text
//! differs from the last user message. An accepted send appends the user message and starts the
//! reply fetch from the same committed history snapshot, under a single lock acquisition.

use crate::assistant::AssistantBackend;
use crate::config::Config;
use crate::debounce::Debounce;
use crate::readiness::{Readiness, ReadinessMonitor};
use crate::reconcile::{fetch_reply, reconcile, ReplyOutcome};
use crate::session::{Message, Origin, SessionStore, StorageKeys};
use crate::storage::KeyValueStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Controller timings and storage keys.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub health_interval: Duration,
    pub debounce_window: Duration,
    pub keys: StorageKeys,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            health_interval: config.assistant.health_interval(),
            debounce_window: config.assistant.debounce_window(),
            keys: StorageKeys::from(&config.storage),
        }
    }
}

/// Why a send was turned away. Rejections are ordinary outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    AwaitingReply,
    NotReady,
    Debounced,
    /// Same text as the most recent user message.
    Duplicate,
    Disposed,
}

/// Result of [`ChatController::send`].
#[derive(Debug)]
pub enum Dispatch {
    Accepted(PendingReply),
    Rejected(Rejection),
}

impl Dispatch {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Dispatch::Accepted(_))
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Dispatch::Accepted(_) => None,
            Dispatch::Rejected(r) => Some(*r),
        }
    }
}

/// Handle on an in-flight reply.
#[derive(Debug)]
pub struct PendingReply {
    task: JoinHandle<ReplyOutcome>,
}

impl PendingReply {
    /// Wait for the reply to be reconciled.
    pub async fn wait(self) -> ReplyOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("controller: reply task ended abnormally: {}", e);
                ReplyOutcome::Discarded
            }
        }
    }
}

struct ControllerState {
    session: SessionStore,
    awaiting_reply: bool,
    debounce: Debounce,
}

struct Inner {
    backend: Arc<dyn AssistantBackend>,
    readiness: ReadinessMonitor,
    state: Mutex<ControllerState>,
    disposed: AtomicBool,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Merge a resolved reply and release the awaiting flag in the same critical section.
    fn complete_reply(&self, text: String) -> ReplyOutcome {
        let mut state = self.lock_state();
        let outcome = if self.is_disposed() {
            ReplyOutcome::Discarded
        } else {
            reconcile(&mut state.session, Message::assistant(text))
        };
        state.awaiting_reply = false;
        outcome
    }
}

/// Clears the awaiting flag if a reply task ends without completing (e.g. it was aborted).
struct AwaitingReply {
    inner: Weak<Inner>,
    armed: bool,
}

impl AwaitingReply {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AwaitingReply {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.lock_state().awaiting_reply = false;
        }
    }
}

/// A mounted chat widget. Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ChatController {
    inner: Arc<Inner>,
}

impl ChatController {
    /// Restore the session from `storage` and start the readiness monitor.
    /// `awaiting_reply` and readiness always start false. Must be called inside a tokio runtime.
    pub fn mount(
        backend: Arc<dyn AssistantBackend>,
        storage: Arc<dyn KeyValueStore>,
        options: ControllerOptions,
    ) -> Self {
        let session = SessionStore::load(storage, options.keys);
        let readiness = ReadinessMonitor::start(Arc::clone(&backend), options.health_interval);
        log::info!(
            "controller: mounted with {} restored message(s)",
            session.len()
        );
        Self {
            inner: Arc::new(Inner {
                backend,
                readiness,
                state: Mutex::new(ControllerState {
                    session,
                    awaiting_reply: false,
                    debounce: Debounce::new(options.debounce_window),
                }),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Submit user input. On acceptance the user message is already in the log when this returns
    /// and the reply is being fetched in the background.
    pub fn send(&self, raw_input: &str) -> Dispatch {
        let history = match self.accept(raw_input) {
            Ok(history) => history,
            Err(rejection) => {
                log::debug!("controller: send rejected: {:?}", rejection);
                return Dispatch::Rejected(rejection);
            }
        };
        log::debug!("controller: dispatching with {} message(s) of history", history.len());
        let backend = Arc::clone(&self.inner.backend);
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            let mut awaiting = AwaitingReply {
                inner: weak.clone(),
                armed: true,
            };
            let text = fetch_reply(backend.as_ref(), &history).await;
            let outcome = match weak.upgrade() {
                Some(inner) => inner.complete_reply(text),
                None => ReplyOutcome::Discarded,
            };
            awaiting.disarm();
            outcome
        });
        Dispatch::Accepted(PendingReply { task })
    }

    /// Run every guard and, if all pass, commit the user message. Returns the committed history.
    fn accept(&self, raw_input: &str) -> Result<Vec<Message>, Rejection> {
        if self.inner.is_disposed() {
            return Err(Rejection::Disposed);
        }
        let text = raw_input.trim();
        if text.is_empty() {
            return Err(Rejection::Empty);
        }
        let mut state = self.inner.lock_state();
        if state.awaiting_reply {
            return Err(Rejection::AwaitingReply);
        }
        if !self.inner.readiness.is_ready() {
            return Err(Rejection::NotReady);
        }
        if !state.debounce.try_arm() {
            return Err(Rejection::Debounced);
        }
        let repeats_last = state
            .session
            .last_from(Origin::User)
            .map(|m| m.text.trim() == text)
            .unwrap_or(false);
        if repeats_last {
            return Err(Rejection::Duplicate);
        }
        let history = state.session.append(Message::user(text));
        state.awaiting_reply = true;
        Ok(history)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock_state().session.messages().to_vec()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.lock_state().session.visible()
    }

    pub fn set_visible(&self, visible: bool) {
        if self.inner.is_disposed() {
            return;
        }
        self.inner.lock_state().session.set_visible(visible);
    }

    /// Flip panel visibility; returns the new value.
    pub fn toggle_visible(&self) -> bool {
        let mut state = self.inner.lock_state();
        if self.inner.is_disposed() {
            return state.session.visible();
        }
        state.session.toggle()
    }

    /// Empty the conversation. Visibility is kept.
    pub fn clear(&self) {
        if self.inner.is_disposed() {
            return;
        }
        self.inner.lock_state().session.clear();
        log::debug!("controller: session cleared");
    }

    /// True between an accepted send and its reconciled reply (drives the typing indicator).
    pub fn is_awaiting_reply(&self) -> bool {
        self.inner.lock_state().awaiting_reply
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.readiness.state()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.readiness.is_ready()
    }

    /// True while the first successful health check is still outstanding.
    pub fn is_checking(&self) -> bool {
        self.inner.readiness.is_checking()
    }

    /// Wait for the assistant to become ready; false if the controller was disposed first.
    pub async fn wait_ready(&self) -> bool {
        self.inner.readiness.wait_ready().await
    }

    /// Tear down: stop health polling, close the debounce window, and turn late replies into no-ops.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.readiness.stop();
        self.inner.lock_state().debounce.cancel();
        log::info!("controller: disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}
