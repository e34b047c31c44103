//! Conversation session manager: the send/receive state machine.
//!
//! Owns the open conversation (message store, staged attachments, mode) and
//! drives one reply at a time through a [`Responder`]. Completed exchanges
//! are recorded in the shared [`HistoryLedger`].
//!
//! States:
//! - Idle -> Sending (submit accepted, user message appended, reply requested)
//! - Sending -> Idle (reply or failure appended)
//!
//! Mode (chat or voice) is orthogonal and never interrupts a reply in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kuberya_core::config::ChatConfig;
use kuberya_core::events::SessionEvent;
use kuberya_core::types::{
    Attachment, Author, ChatMode, Message, MessageId, ModelLabel, Timestamp,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::attachments::{AttachmentStager, BlobRegistry, RawFile};
use crate::error::ChatError;
use crate::history::HistoryLedger;
use crate::simulator::Responder;
use crate::store::MessageStore;

/// Capacity of the session event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Whether a reply is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Idle,
    Sending,
}

/// Why a submit was not accepted. None of these are errors; the caller
/// should have disabled the send control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitRejection {
    /// Blank text and nothing staged.
    Empty,
    /// A reply is still outstanding.
    AwaitingReply,
    /// The last message is not a failed reply.
    NothingToRetry,
}

/// Result of [`SessionManager::submit`] and [`SessionManager::retry_last`].
#[derive(Debug)]
pub enum SubmitOutcome {
    Sent(PendingReply),
    Ignored(SubmitRejection),
}

impl SubmitOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SubmitOutcome::Sent(_))
    }

    pub fn into_pending(self) -> Option<PendingReply> {
        match self {
            SubmitOutcome::Sent(pending) => Some(pending),
            SubmitOutcome::Ignored(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<SubmitRejection> {
        match self {
            SubmitOutcome::Sent(_) => None,
            SubmitOutcome::Ignored(reason) => Some(*reason),
        }
    }
}

/// Handle to one outstanding reply.
///
/// Dropping the handle does not cancel the reply.
#[derive(Debug)]
pub struct PendingReply {
    ticket: u64,
    message_id: MessageId,
    handle: JoinHandle<()>,
    inner: Arc<Inner>,
}

impl PendingReply {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// The user message this reply answers.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until the reply (or its failure) has landed in the store.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::debug!(ticket = self.ticket, error = %e, "Reply task ended without completing");
        }
    }

    /// Abort the reply. The user message stays; no assistant message is
    /// appended and nothing is recorded in history.
    pub fn cancel(self) {
        self.handle.abort();
        self.inner.cancel_reply(self.ticket);
    }
}

/// Point-in-time copy of the open session, for rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: ChatMode,
    pub messages: Vec<Message>,
    pub pending_attachments: Vec<Attachment>,
    pub is_awaiting_reply: bool,
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug)]
struct SessionState {
    mode: ChatMode,
    messages: MessageStore,
    stager: AttachmentStager,
    /// Ticket of the reply currently awaited, if any.
    awaiting: Option<u64>,
    next_ticket: u64,
}

impl SessionState {
    fn begin_reply(&mut self) -> u64 {
        self.next_ticket += 1;
        self.awaiting = Some(self.next_ticket);
        self.next_ticket
    }

    /// Only the awaited ticket may return the session to idle; a reply that
    /// outlived a reset must not unlock a newer send.
    fn finish_reply(&mut self, ticket: u64) -> bool {
        if self.awaiting == Some(ticket) {
            self.awaiting = None;
            true
        } else {
            false
        }
    }
}

struct Inner {
    state: Mutex<SessionState>,
    model: Mutex<ModelLabel>,
    responder: Arc<dyn Responder>,
    ledger: Arc<HistoryLedger>,
    blobs: Arc<BlobRegistry>,
    settings: ChatConfig,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("state", &self.state)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn model_label(&self) -> ModelLabel {
        self.model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn request_reply(&self, user_text: &str) -> Result<String, ChatError> {
        match self.settings.reply_timeout_ms {
            Some(ms) => tokio::time::timeout(
                Duration::from_millis(ms),
                self.responder.respond_to(user_text),
            )
            .await
            .map_err(|_| ChatError::Timeout(ms))?,
            None => self.responder.respond_to(user_text).await,
        }
    }

    fn complete_reply(&self, ticket: u64, user_text: &str, result: Result<String, ChatError>) {
        match result {
            Ok(reply) => {
                let message = Message::assistant(reply);
                let unlocked = {
                    let mut state = self.lock_state();
                    state.messages.append(message.clone());
                    state.finish_reply(ticket)
                };
                tracing::debug!(ticket, unlocked, "Reply appended");
                self.emit(SessionEvent::MessageAppended {
                    message_id: message.id,
                    author: Author::Assistant,
                    timestamp: message.created_at,
                });

                let entry =
                    self.ledger
                        .record_interaction(user_text, &message.text, &self.model_label());
                tracing::info!(ticket, entry_id = %entry.id, "Interaction completed");
                self.emit(SessionEvent::InteractionCompleted {
                    title: entry.title,
                    summary: entry.summary,
                    timestamp: Timestamp::now(),
                });
            }
            Err(err) => {
                tracing::warn!(ticket, error = %err, "Reply failed");
                let message = Message::reply_failure(self.settings.failure_message.clone());
                {
                    let mut state = self.lock_state();
                    state.messages.append(message.clone());
                    state.finish_reply(ticket);
                }
                self.emit(SessionEvent::MessageAppended {
                    message_id: message.id,
                    author: Author::Assistant,
                    timestamp: message.created_at,
                });
                self.emit(SessionEvent::ReplyFailed {
                    ticket,
                    reason: err.to_string(),
                    timestamp: Timestamp::now(),
                });
            }
        }
    }

    fn cancel_reply(&self, ticket: u64) {
        let was_awaited = self.lock_state().finish_reply(ticket);
        if was_awaited {
            tracing::info!(ticket, "Reply cancelled");
            self.emit(SessionEvent::ReplyFailed {
                ticket,
                reason: ChatError::Cancelled.to_string(),
                timestamp: Timestamp::now(),
            });
        }
    }
}

// =============================================================================
// SessionManager
// =============================================================================

/// Owner of the open conversation.
///
/// Cheap to clone; clones share the same session. Every store is behind its
/// own mutex and no lock is held across an await, so reply tasks and user
/// actions serialize per store. [`SessionManager::submit`] spawns onto the
/// current tokio runtime.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        settings: ChatConfig,
        responder: Arc<dyn Responder>,
        ledger: Arc<HistoryLedger>,
        model_label: ModelLabel,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let blobs = Arc::new(BlobRegistry::new());
        let state = SessionState {
            mode: ChatMode::default(),
            messages: MessageStore::new(),
            stager: AttachmentStager::new(Arc::clone(&blobs)),
            awaiting: None,
            next_ticket: 0,
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                model: Mutex::new(model_label),
                responder,
                ledger,
                blobs,
                settings,
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // ---- Send pipeline ----

    /// Whether [`SessionManager::submit`] would accept `text` right now.
    pub fn can_submit(&self, text: &str) -> bool {
        let state = self.inner.lock_state();
        state.awaiting.is_none() && (!text.trim().is_empty() || !state.stager.is_empty())
    }

    /// Send `text` together with everything staged.
    ///
    /// Rejected (a no-op) when text is blank and nothing is staged, or while
    /// a reply is outstanding. Otherwise the user message is appended, the
    /// stager is cleared and a reply is requested in the background.
    pub fn submit(&self, text: &str) -> SubmitOutcome {
        let (ticket, message) = {
            let mut state = self.inner.lock_state();
            if state.awaiting.is_some() {
                tracing::debug!("Submit ignored: reply outstanding");
                return SubmitOutcome::Ignored(SubmitRejection::AwaitingReply);
            }
            let blank = text.trim().is_empty();
            if blank && state.stager.is_empty() {
                tracing::debug!("Submit ignored: nothing to send");
                return SubmitOutcome::Ignored(SubmitRejection::Empty);
            }

            let attachments = state.stager.take();
            let body = if blank {
                self.inner.settings.attachment_placeholder.clone()
            } else {
                text.to_string()
            };
            let message = Message::user(body, attachments);
            state.messages.append(message.clone());
            (state.begin_reply(), message)
        };

        tracing::debug!(
            ticket,
            attachments = message.attachments.len(),
            "User message submitted"
        );
        self.inner.emit(SessionEvent::MessageAppended {
            message_id: message.id,
            author: Author::User,
            timestamp: message.created_at,
        });
        SubmitOutcome::Sent(self.spawn_reply(ticket, message.id, message.text))
    }

    /// Ask again for the last user message after a failed reply.
    ///
    /// No new user message is appended.
    pub fn retry_last(&self) -> SubmitOutcome {
        let (ticket, message_id, text) = {
            let mut state = self.inner.lock_state();
            if state.awaiting.is_some() {
                return SubmitOutcome::Ignored(SubmitRejection::AwaitingReply);
            }
            let last_failed = state.messages.last().is_some_and(|m| m.failed);
            let Some(user) = state.messages.last_user().filter(|_| last_failed) else {
                return SubmitOutcome::Ignored(SubmitRejection::NothingToRetry);
            };
            let (message_id, text) = (user.id, user.text.clone());
            (state.begin_reply(), message_id, text)
        };

        tracing::info!(ticket, "Retrying failed reply");
        SubmitOutcome::Sent(self.spawn_reply(ticket, message_id, text))
    }

    fn spawn_reply(&self, ticket: u64, message_id: MessageId, user_text: String) -> PendingReply {
        self.inner.emit(SessionEvent::ReplyRequested {
            ticket,
            timestamp: Timestamp::now(),
        });
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = inner.request_reply(&user_text).await;
            inner.complete_reply(ticket, &user_text, result);
        });
        PendingReply {
            ticket,
            message_id,
            handle,
            inner: Arc::clone(&self.inner),
        }
    }

    // ---- Conversation lifecycle ----

    /// Empty the message store and return to idle.
    ///
    /// A reply already requested is not cancelled: it still lands in the
    /// (now new) conversation and is still recorded in history.
    pub fn start_new_conversation(&self) {
        let (discarded, abandoned) = {
            let mut state = self.inner.lock_state();
            (state.messages.reset(), state.awaiting.take())
        };
        tracing::info!(discarded, abandoned_ticket = ?abandoned, "New conversation started");
        self.inner.emit(SessionEvent::ConversationReset {
            discarded_messages: discarded,
            timestamp: Timestamp::now(),
        });
    }

    // ---- Mode ----

    pub fn mode(&self) -> ChatMode {
        self.inner.lock_state().mode
    }

    pub fn set_mode(&self, mode: ChatMode) {
        let from = std::mem::replace(&mut self.inner.lock_state().mode, mode);
        if from != mode {
            tracing::debug!(%from, to = %mode, "Mode changed");
            self.inner.emit(SessionEvent::ModeChanged {
                from,
                to: mode,
                timestamp: Timestamp::now(),
            });
        }
    }

    /// Flip between chat and voice. Returns the new mode.
    pub fn toggle_mode(&self) -> ChatMode {
        let next = self.mode().toggled();
        self.set_mode(next);
        next
    }

    // ---- Attachments ----

    /// Stage files for the next submit. Accepted in any phase.
    pub fn add_attachments(&self, files: Vec<RawFile>) -> usize {
        let count = self.inner.lock_state().stager.add(files);
        if count > 0 {
            tracing::debug!(count, "Attachments staged");
            self.inner.emit(SessionEvent::AttachmentsStaged {
                count,
                timestamp: Timestamp::now(),
            });
        }
        count
    }

    /// Unstage the attachment at `index`. Out of range is a no-op.
    pub fn remove_attachment(&self, index: usize) -> Option<Attachment> {
        let removed = self.inner.lock_state().stager.remove(index);
        if removed.is_some() {
            self.inner.emit(SessionEvent::AttachmentRemoved {
                index,
                timestamp: Timestamp::now(),
            });
        }
        removed
    }

    pub fn pending_attachments(&self) -> Vec<Attachment> {
        self.inner.lock_state().stager.pending().to_vec()
    }

    pub fn blobs(&self) -> &Arc<BlobRegistry> {
        &self.inner.blobs
    }

    // ---- Reads ----

    /// Every message of the open conversation, in append order.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock_state().messages.all().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock_state().messages.len()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.inner.lock_state().awaiting.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_awaiting_reply() {
            SessionPhase::Sending
        } else {
            SessionPhase::Idle
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock_state();
        SessionSnapshot {
            mode: state.mode,
            messages: state.messages.all().to_vec(),
            pending_attachments: state.stager.pending().to_vec(),
            is_awaiting_reply: state.awaiting.is_some(),
        }
    }

    pub fn history(&self) -> &Arc<HistoryLedger> {
        &self.inner.ledger
    }

    // ---- Model ----

    pub fn model_label(&self) -> ModelLabel {
        self.inner.model_label()
    }

    /// Label recorded with interactions that complete from now on.
    pub fn set_model_label(&self, label: ModelLabel) {
        *self
            .inner
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = label;
    }
}

// =============================================================================
// Tests
// =============================================================================
