use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::User => write!(f, "user"),
            Author::Assistant => write!(f, "assistant"),
        }
    }
}

/// Interaction surface currently shown for the open conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Text chat with a message thread and composer.
    #[default]
    Chat,
    /// Voice agent surface (simulated audio level only).
    Voice,
}

impl ChatMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ChatMode::Chat => ChatMode::Voice,
            ChatMode::Voice => ChatMode::Chat,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Chat => write!(f, "Chat"),
            ChatMode::Voice => write!(f, "Voice"),
        }
    }
}

/// Attachment classification, derived from the MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    File,
}

impl AttachmentKind {
    /// `image/*` is an image; anything else, including garbage, is a file.
    pub fn from_mime(mime_type: &str) -> Self {
        let is_image = mime_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"));
        if is_image {
            AttachmentKind::Image
        } else {
            AttachmentKind::File
        }
    }
}

/// Cosmetic theme flag supplied by the theming shell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

// =============================================================================
// Newtype Wrappers - Identifiers
// =============================================================================

/// Message identifier. UUID v7, so ids sort in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// History entry identifier. Never shared with a [`MessageId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HistoryEntryId(pub Uuid);

impl HistoryEntryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for HistoryEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HistoryEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ephemeral, process-local reference to attachment bytes.
///
/// Rendered like a browser object URL (`blob:kuberya/<uuid>`). It is not a
/// durable location and becomes dangling once released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef(pub Uuid);

impl BlobRef {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlobRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:kuberya/{}", self.0)
    }
}

/// Assistant variant label, as picked in the model selector. Opaque.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelLabel(pub String);

impl ModelLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Newtype Wrappers - Temporal
// =============================================================================

/// Unix timestamp in seconds since epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// Local wall-clock time as `HH:MM`, the way message bubbles show it.
    pub fn clock_time(&self) -> String {
        self.to_datetime()
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }
}

// =============================================================================
// Structs
// =============================================================================

/// A file staged for sending, or already attached to a sent message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub location: BlobRef,
    pub display_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// One entry in the open conversation. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub author: Author,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Set on an assistant message that reports a failed reply.
    #[serde(default)]
    pub failed: bool,
}

impl Message {
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            author: Author::User,
            created_at: Timestamp::now(),
            attachments,
            failed: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            author: Author::Assistant,
            created_at: Timestamp::now(),
            attachments: Vec::new(),
            failed: false,
        }
    }

    /// Assistant message standing in for a reply that never arrived.
    pub fn reply_failure(text: impl Into<String>) -> Self {
        Self {
            failed: true,
            ..Self::assistant(text)
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

/// Summary row in the history sidebar. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    /// Rendered once at creation and never recomputed.
    pub created_at_display: String,
    pub model_label: ModelLabel,
    pub title: String,
    pub summary: String,
}
