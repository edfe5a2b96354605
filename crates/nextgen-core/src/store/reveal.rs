//! Progressive reveal of a simulated assistant reply.
//!
//! A reply runs as a spawned task that wakes once per interval, re-acquires the
//! store state and replaces the placeholder content with one more word. The
//! store keeps the task's handle per conversation and aborts it on delete,
//! deselect or rehydrate; every tick also re-checks that the placeholder is
//! still `sending`, so a tick that races a cancellation changes nothing.

use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use super::events::StoreEvent;
use super::{Shared, StoreState};
use crate::conversation::Message;

/// Lifecycle of one in-flight reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPhase {
    /// Placeholder appended, no word revealed yet.
    Pending,
    Revealing { revealed_words: usize },
    /// Placeholder replaced by the final message `message_id`.
    Finalized { message_id: String },
    Cancelled,
}

impl ReplyPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized { .. } | Self::Cancelled)
    }
}

/// Caller-side view of a reply started by the store.
#[derive(Debug, Clone)]
pub struct ReplyTicket {
    pub conversation_id: String,
    pub placeholder_id: String,
    phase: watch::Receiver<ReplyPhase>,
}

impl ReplyTicket {
    pub fn phase(&self) -> ReplyPhase {
        self.phase.borrow().clone()
    }

    /// Wait until the reply is finalized or cancelled.
    pub async fn finished(mut self) -> ReplyPhase {
        match self.phase.wait_for(ReplyPhase::is_terminal).await {
            Ok(phase) => phase.clone(),
            // Sender gone without a terminal phase: the store was dropped.
            Err(_) => ReplyPhase::Cancelled,
        }
    }
}

/// Store-side handle of a running reveal.
pub(crate) struct RevealTask {
    pub(crate) placeholder_id: String,
    handle: JoinHandle<()>,
    phase: Arc<watch::Sender<ReplyPhase>>,
}

impl RevealTask {
    /// Stop the task. The caller owns marking the placeholder as failed.
    pub(crate) fn cancel(self) {
        self.handle.abort();
        settle(&self.phase, ReplyPhase::Cancelled);
    }
}

/// Cumulative word-by-word states of `text`: "a b c" gives "a", "a b", "a b c".
pub fn reveal_frames(text: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        frames.push(current.clone());
    }
    frames
}

/// Spawn the reveal of `full_text` into `placeholder_id`.
pub(crate) fn spawn_reveal(
    state: &Arc<Mutex<StoreState>>,
    shared: &Shared,
    conversation_id: &str,
    placeholder_id: &str,
    full_text: String,
) -> (RevealTask, ReplyTicket) {
    let (phase_tx, phase_rx) = watch::channel(ReplyPhase::Pending);
    let phase_tx = Arc::new(phase_tx);

    let handle = tokio::spawn(run_reveal(
        Arc::downgrade(state),
        shared.clone(),
        conversation_id.to_string(),
        placeholder_id.to_string(),
        full_text,
        phase_tx.clone(),
    ));

    let task = RevealTask {
        placeholder_id: placeholder_id.to_string(),
        handle,
        phase: phase_tx,
    };
    let ticket = ReplyTicket {
        conversation_id: conversation_id.to_string(),
        placeholder_id: placeholder_id.to_string(),
        phase: phase_rx,
    };
    (task, ticket)
}

async fn run_reveal(
    state: Weak<Mutex<StoreState>>,
    shared: Shared,
    conversation_id: String,
    placeholder_id: String,
    full_text: String,
    phase: Arc<watch::Sender<ReplyPhase>>,
) {
    let interval = shared.settings.reveal_interval();

    for (index, frame) in reveal_frames(&full_text).into_iter().enumerate() {
        tokio::time::sleep(interval).await;

        let Some(state) = state.upgrade() else {
            return settle(&phase, ReplyPhase::Cancelled);
        };
        let mut guard = state.lock().await;

        let placeholder = guard
            .conversation_mut(&conversation_id)
            .and_then(|conv| conv.message_mut(&placeholder_id))
            .filter(|message| message.is_sending());
        let Some(placeholder) = placeholder else {
            debug!(
                "Reveal target {}/{} is gone, stopping",
                conversation_id, placeholder_id
            );
            return settle(&phase, ReplyPhase::Cancelled);
        };

        placeholder.content = frame.clone();
        phase.send_replace(ReplyPhase::Revealing {
            revealed_words: index + 1,
        });
        shared.emit(StoreEvent::ReplyProgress {
            conversation_id: conversation_id.clone(),
            placeholder_id: placeholder_id.clone(),
            content: frame,
        });
    }

    let Some(state) = state.upgrade() else {
        return settle(&phase, ReplyPhase::Cancelled);
    };
    let mut guard = state.lock().await;

    let finalized = Message::assistant(full_text, Utc::now());
    let still_sending = guard
        .conversation(&conversation_id)
        .and_then(|conv| conv.message(&placeholder_id))
        .is_some_and(Message::is_sending);
    if !still_sending {
        return settle(&phase, ReplyPhase::Cancelled);
    }

    let Some(conv) = guard.conversation_mut(&conversation_id) else {
        return settle(&phase, ReplyPhase::Cancelled);
    };
    conv.replace_message(&placeholder_id, finalized.clone());
    let message = conv
        .message(&finalized.id)
        .cloned()
        .unwrap_or(finalized);

    if guard
        .reveals
        .get(&conversation_id)
        .is_some_and(|task| task.placeholder_id == placeholder_id)
    {
        // Dropping our own handle does not abort the running task.
        guard.reveals.remove(&conversation_id);
    }

    shared.persist_or_report(&guard);
    drop(guard);

    debug!(
        "Finalized reply {} -> {} in {}",
        placeholder_id, message.id, conversation_id
    );
    phase.send_replace(ReplyPhase::Finalized {
        message_id: message.id.clone(),
    });
    shared.emit(StoreEvent::ReplyFinalized {
        conversation_id,
        placeholder_id,
        message,
    });
}

/// Publish a terminal phase unless one was already published.
fn settle(phase: &watch::Sender<ReplyPhase>, terminal: ReplyPhase) {
    phase.send_if_modified(|current| {
        if current.is_terminal() {
            false
        } else {
            *current = terminal;
            true
        }
    });
}
