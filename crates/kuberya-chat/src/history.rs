//! History ledger: the sidebar list of completed interactions.
//!
//! Entries are prepended (most recently completed first), never mutated,
//! and removed only by explicit user action. Selection is tracked for
//! highlighting; selecting an entry does not reload its messages.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use kuberya_core::config::{ChatConfig, HistoryConfig, KuberyaConfig};
use kuberya_core::error::Result;
use kuberya_core::events::SessionEvent;
use kuberya_core::types::{HistoryEntry, HistoryEntryId, ModelLabel, Timestamp};
use tokio::sync::broadcast;

/// Appended to text cut by [`truncate_chars`].
pub const ELLIPSIS: &str = "...";

const FALLBACK_TIMESTAMP_FORMAT: &str = "%B %-d, %Y at %-I:%M %p";

/// Cut `text` to `max_chars` characters and append [`ELLIPSIS`], but only
/// when it is longer than `max_chars`. Counts chars, not bytes or words.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Render `at` with a chrono format string, falling back to the default
/// layout when the pattern is invalid.
pub fn format_display_timestamp(at: DateTime<Local>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(pattern)).is_ok() {
        return out;
    }
    tracing::warn!(pattern, "Invalid history timestamp format, using default");
    at.format(FALLBACK_TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: VecDeque<HistoryEntry>,
    active: Option<HistoryEntryId>,
}

/// Most-recent-first list of interaction summaries.
#[derive(Debug)]
pub struct HistoryLedger {
    state: Mutex<LedgerState>,
    title_max_chars: usize,
    summary_max_chars: usize,
    timestamp_format: String,
    events: Option<broadcast::Sender<SessionEvent>>,
}

impl HistoryLedger {
    pub fn new(chat: &ChatConfig, history: &HistoryConfig) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            title_max_chars: chat.title_max_chars,
            summary_max_chars: chat.summary_max_chars,
            timestamp_format: history.timestamp_format.clone(),
            events: None,
        }
    }

    /// Build a ledger from the full configuration, seeding the sample
    /// conversations when `history.seed_demo_entries` is set.
    pub fn from_config(config: &KuberyaConfig) -> Self {
        let ledger = Self::new(&config.chat, &config.history);
        if config.history.seed_demo_entries {
            ledger.seed_demo_entries();
        }
        ledger
    }

    /// Publish ledger changes on `events`.
    pub fn with_events(mut self, events: broadcast::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the contents with the sample conversations and select the
    /// first one.
    pub fn seed_demo_entries(&self) {
        let entries: VecDeque<HistoryEntry> = DEMO_ENTRIES
            .iter()
            .map(|(when, model, title, summary)| HistoryEntry {
                id: HistoryEntryId::new(),
                created_at_display: (*when).to_string(),
                model_label: ModelLabel::new(*model),
                title: (*title).to_string(),
                summary: (*summary).to_string(),
            })
            .collect();
        let mut state = self.lock();
        state.active = entries.front().map(|e| e.id);
        state.entries = entries;
    }

    /// Record one completed interaction at the top of the list.
    ///
    /// `title` and `summary` are the raw user text and reply; they are
    /// truncated to the configured limits here.
    pub fn record_interaction(
        &self,
        title: &str,
        summary: &str,
        model_label: &ModelLabel,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: HistoryEntryId::new(),
            created_at_display: format_display_timestamp(Local::now(), &self.timestamp_format),
            model_label: model_label.clone(),
            title: truncate_chars(title, self.title_max_chars),
            summary: truncate_chars(summary, self.summary_max_chars),
        };
        self.lock().entries.push_front(entry.clone());
        tracing::debug!(entry_id = %entry.id, model = %entry.model_label, "History entry recorded");
        self.emit(SessionEvent::HistoryEntryRecorded {
            entry_id: entry.id,
            model_label: entry.model_label.clone(),
            timestamp: Timestamp::now(),
        });
        entry
    }

    /// Remove the entry with `id`. Unknown ids are a no-op.
    ///
    /// Deleting the active entry moves the selection to the first remaining
    /// entry, or to none when the list is now empty.
    pub fn delete(&self, id: HistoryEntryId) -> bool {
        let reselected = {
            let mut state = self.lock();
            let Some(pos) = state.entries.iter().position(|e| e.id == id) else {
                return false;
            };
            state.entries.remove(pos);
            if state.active == Some(id) {
                state.active = state.entries.front().map(|e| e.id);
                Some(state.active)
            } else {
                None
            }
        };

        self.emit(SessionEvent::HistoryEntryDeleted {
            entry_id: id,
            timestamp: Timestamp::now(),
        });
        if let Some(active) = reselected {
            tracing::debug!(deleted = %id, ?active, "Active history entry deleted, reselected");
            self.emit(SessionEvent::HistorySelectionChanged {
                active,
                timestamp: Timestamp::now(),
            });
        }
        true
    }

    /// Empty the ledger and clear the selection. Returns how many entries
    /// were removed.
    pub fn clear_all(&self) -> usize {
        let removed = {
            let mut state = self.lock();
            state.active = None;
            let removed = state.entries.len();
            state.entries.clear();
            removed
        };
        tracing::info!(removed, "History cleared");
        self.emit(SessionEvent::HistoryCleared {
            removed,
            timestamp: Timestamp::now(),
        });
        removed
    }

    /// Highlight the entry with `id`. Unknown ids leave the selection as is.
    ///
    /// This does not reconstruct that conversation in the message store.
    pub fn select(&self, id: HistoryEntryId) -> bool {
        {
            let mut state = self.lock();
            if !state.entries.iter().any(|e| e.id == id) {
                return false;
            }
            state.active = Some(id);
        }
        self.emit(SessionEvent::HistorySelectionChanged {
            active: Some(id),
            timestamp: Timestamp::now(),
        });
        true
    }

    pub fn clear_selection(&self) {
        let previous = self.lock().active.take();
        if previous.is_some() {
            self.emit(SessionEvent::HistorySelectionChanged {
                active: None,
                timestamp: Timestamp::now(),
            });
        }
    }

    pub fn active(&self) -> Option<HistoryEntryId> {
        self.lock().active
    }

    /// Snapshot of all entries, most recent first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn get(&self, id: HistoryEntryId) -> Option<HistoryEntry> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Entry at a display position (0 is the top row).
    pub fn nth(&self, index: usize) -> Option<HistoryEntry> {
        self.lock().entries.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Pretty JSON of every entry, most recent first.
    pub fn export_json(&self) -> Result<String> {
        let entries = self.entries();
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(ref tx) = self.events {
            // No subscribers is fine.
            let _ = tx.send(event);
        }
    }
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(&ChatConfig::default(), &HistoryConfig::default())
    }
}

/// (created_at_display, model, title, summary)
const DEMO_ENTRIES: [(&str, &str, &str, &str); 8] = [
    (
        "September 25, 2025 at 10:30 AM",
        "Mentify 1",
        "Welcome conversation",
        "Initial setup and introduction to the platform features and capabilities.",
    ),
    (
        "September 24, 2025 at 2:15 PM",
        "Mentify 2",
        "Code assistance",
        "Help with React component development and TypeScript implementation.",
    ),
    (
        "September 23, 2025 at 9:45 AM",
        "Mentify 4",
        "Creative writing",
        "Collaborative story writing session with character development.",
    ),
    (
        "September 22, 2025 at 4:20 PM",
        "Mentify 1",
        "Data analysis help",
        "Assistance with interpreting statistical data and creating visualizations.",
    ),
    (
        "September 21, 2025 at 11:30 AM",
        "Mentify 3",
        "Language learning",
        "Practice conversation in Spanish with grammar corrections and tips.",
    ),
    (
        "September 20, 2025 at 3:45 PM",
        "Mentify 2",
        "Recipe suggestions",
        "Healthy meal planning and cooking instructions for vegetarian dishes.",
    ),
    (
        "September 18, 2025 at 8:15 AM",
        "Mentify 1",
        "Travel planning",
        "Itinerary creation for a 2-week European vacation with budget considerations.",
    ),
    (
        "September 17, 2025 at 6:30 PM",
        "Mentify 4",
        "Business strategy",
        "Market analysis and competitive positioning for a new startup idea.",
    ),
];

// =============================================================================
// Tests
// =============================================================================
