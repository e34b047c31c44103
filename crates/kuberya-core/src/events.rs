use serde::{Deserialize, Serialize};

use crate::types::{Author, ChatMode, HistoryEntryId, MessageId, ModelLabel, Timestamp};

/// Everything observable that happens to the open session and the history
/// ledger.
///
/// Published on a broadcast channel and consumed by:
/// - The terminal front end (to render replies as they land)
/// - Tests (to observe ordering without polling)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    // =========================================================================
    // Conversation Events
    // =========================================================================
    /// A message was appended to the open conversation.
    MessageAppended {
        message_id: MessageId,
        author: Author,
        timestamp: Timestamp,
    },

    /// A reply was requested from the responder.
    ReplyRequested { ticket: u64, timestamp: Timestamp },

    /// A requested reply could not be produced.
    ReplyFailed {
        ticket: u64,
        reason: String,
        timestamp: Timestamp,
    },

    /// One user submit and its reply completed.
    InteractionCompleted {
        title: String,
        summary: String,
        timestamp: Timestamp,
    },

    /// The message store was emptied for a new conversation.
    ConversationReset {
        discarded_messages: usize,
        timestamp: Timestamp,
    },

    /// The interaction surface switched between chat and voice.
    ModeChanged {
        from: ChatMode,
        to: ChatMode,
        timestamp: Timestamp,
    },

    // =========================================================================
    // Attachment Events
    // =========================================================================
    /// Files were staged for the next submit.
    AttachmentsStaged { count: usize, timestamp: Timestamp },

    /// A staged attachment was removed before sending.
    AttachmentRemoved { index: usize, timestamp: Timestamp },

    // =========================================================================
    // History Events
    // =========================================================================
    /// A history entry was recorded for a completed interaction.
    HistoryEntryRecorded {
        entry_id: HistoryEntryId,
        model_label: ModelLabel,
        timestamp: Timestamp,
    },

    /// A history entry was deleted.
    HistoryEntryDeleted {
        entry_id: HistoryEntryId,
        timestamp: Timestamp,
    },

    /// The history ledger was emptied.
    HistoryCleared { removed: usize, timestamp: Timestamp },

    /// The highlighted history row changed.
    HistorySelectionChanged {
        active: Option<HistoryEntryId>,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SessionEvent::MessageAppended { timestamp, .. }
            | SessionEvent::ReplyRequested { timestamp, .. }
            | SessionEvent::ReplyFailed { timestamp, .. }
            | SessionEvent::InteractionCompleted { timestamp, .. }
            | SessionEvent::ConversationReset { timestamp, .. }
            | SessionEvent::ModeChanged { timestamp, .. }
            | SessionEvent::AttachmentsStaged { timestamp, .. }
            | SessionEvent::AttachmentRemoved { timestamp, .. }
            | SessionEvent::HistoryEntryRecorded { timestamp, .. }
            | SessionEvent::HistoryEntryDeleted { timestamp, .. }
            | SessionEvent::HistoryCleared { timestamp, .. }
            | SessionEvent::HistorySelectionChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::MessageAppended { .. } => "message_appended",
            SessionEvent::ReplyRequested { .. } => "reply_requested",
            SessionEvent::ReplyFailed { .. } => "reply_failed",
            SessionEvent::InteractionCompleted { .. } => "interaction_completed",
            SessionEvent::ConversationReset { .. } => "conversation_reset",
            SessionEvent::ModeChanged { .. } => "mode_changed",
            SessionEvent::AttachmentsStaged { .. } => "attachments_staged",
            SessionEvent::AttachmentRemoved { .. } => "attachment_removed",
            SessionEvent::HistoryEntryRecorded { .. } => "history_entry_recorded",
            SessionEvent::HistoryEntryDeleted { .. } => "history_entry_deleted",
            SessionEvent::HistoryCleared { .. } => "history_cleared",
            SessionEvent::HistorySelectionChanged { .. } => "history_selection_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_timestamp() {
        let ts = Timestamp::now();
        let event = SessionEvent::ReplyRequested {
            ticket: 1,
            timestamp: ts,
        };
        assert_eq!(event.timestamp(), ts);
    }

    #[test]
    fn test_event_name() {
        let event = SessionEvent::ModeChanged {
            from: ChatMode::Chat,
            to: ChatMode::Voice,
            timestamp: Timestamp::now(),
        };
        assert_eq!(event.event_name(), "mode_changed");

        let event = SessionEvent::HistoryCleared {
            removed: 3,
            timestamp: Timestamp::now(),
        };
        assert_eq!(event.event_name(), "history_cleared");
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::MessageAppended {
            message_id: MessageId::new(),
            author: Author::User,
            timestamp: Timestamp::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("MessageAppended"));
        assert!(json.contains("\"author\":\"user\""));

        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_selection_changed_to_none_serializes_null() {
        let event = SessionEvent::HistorySelectionChanged {
            active: None,
            timestamp: Timestamp(0),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"active\":null"));
    }
}
