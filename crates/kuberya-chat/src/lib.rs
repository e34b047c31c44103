//! Conversation engine for Kuberya Bot.
//!
//! Provides the chat session state machine, attachment staging, the reply
//! simulator, the history ledger, plus the voice agent, support desk and
//! application shell that sit around them.

pub mod attachments;
pub mod error;
pub mod history;
pub mod session;
pub mod shell;
pub mod simulator;
pub mod store;
pub mod support;
pub mod voice;

pub use attachments::{AttachmentStager, BlobRegistry, RawFile};
pub use error::ChatError;
pub use history::{truncate_chars, HistoryLedger};
pub use session::{
    PendingReply, SessionManager, SessionPhase, SessionSnapshot, SubmitOutcome, SubmitRejection,
};
pub use shell::AppShell;
pub use simulator::{Responder, ResponseSimulator};
pub use store::MessageStore;
pub use support::{SupportDesk, SupportMessage};
pub use voice::VoiceAgent;
