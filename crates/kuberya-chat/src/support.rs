//! Customer-support widget.
//!
//! A self-contained thread with its own canned bot. It shares nothing with
//! the conversation session or the history ledger.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kuberya_core::config::SupportConfig;
use kuberya_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportMessage {
    /// One-based position at the time the message was composed.
    pub id: u64,
    pub text: String,
    pub from_bot: bool,
    pub created_at: Timestamp,
}

#[derive(Debug)]
pub struct SupportDesk {
    messages: Arc<Mutex<Vec<SupportMessage>>>,
    canned_reply: String,
    reply_delay: Duration,
    open: bool,
    minimized: bool,
}

impl SupportDesk {
    pub fn new(config: &SupportConfig) -> Self {
        let greeting = SupportMessage {
            id: 1,
            text: config.greeting.clone(),
            from_bot: true,
            created_at: Timestamp::now(),
        };
        Self {
            messages: Arc::new(Mutex::new(vec![greeting])),
            canned_reply: config.canned_reply.clone(),
            reply_delay: Duration::from_millis(config.reply_delay_ms),
            open: false,
            minimized: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SupportMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post `text` and schedule the canned answer. Blank text is ignored.
    pub fn send(&self, text: &str) -> Option<JoinHandle<()>> {
        if text.trim().is_empty() {
            return None;
        }
        {
            let mut messages = self.lock();
            let id = messages.len() as u64 + 1;
            messages.push(SupportMessage {
                id,
                text: text.to_string(),
                from_bot: false,
                created_at: Timestamp::now(),
            });
        }

        let messages = Arc::clone(&self.messages);
        let reply = self.canned_reply.clone();
        let delay = self.reply_delay;
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut messages = messages.lock().unwrap_or_else(PoisonError::into_inner);
            let id = messages.len() as u64 + 1;
            messages.push(SupportMessage {
                id,
                text: reply,
                from_bot: true,
                created_at: Timestamp::now(),
            });
        }))
    }

    pub fn canned_reply(&self) -> &str {
        &self.canned_reply
    }

    pub fn messages(&self) -> Vec<SupportMessage> {
        self.lock().clone()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Closing keeps the thread.
    pub fn close(&mut self) {
        self.open = false;
        self.minimized = false;
    }

    pub fn toggle_minimized(&mut self) -> bool {
        self.minimized = !self.minimized;
        self.minimized
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }
}

impl Default for SupportDesk {
    fn default() -> Self {
        Self::new(&SupportConfig::default())
    }
}
