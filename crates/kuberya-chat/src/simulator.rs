//! Reply backends.
//!
//! [`Responder`] is the seam between the session manager and whatever
//! produces assistant replies. [`ResponseSimulator`] fabricates a templated
//! reply after a randomized delay.

use std::time::Duration;

use async_trait::async_trait;
use kuberya_core::config::SimulatorConfig;
use rand::Rng;

use crate::error::ChatError;

/// Produces the assistant's reply to one user message.
///
/// Implementations must not resolve synchronously; the session manager
/// relies on observing a pending state between request and reply.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond_to(&self, user_text: &str) -> Result<String, ChatError>;
}

/// Local stand-in for an inference backend. Never fails.
#[derive(Debug, Clone)]
pub struct ResponseSimulator {
    template: String,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl ResponseSimulator {
    pub fn new(config: &SimulatorConfig) -> Self {
        let (min_delay_ms, max_delay_ms) = if config.min_delay_ms <= config.max_delay_ms {
            (config.min_delay_ms, config.max_delay_ms)
        } else {
            tracing::warn!(
                min = config.min_delay_ms,
                max = config.max_delay_ms,
                "Simulator delay range inverted, swapping bounds"
            );
            (config.max_delay_ms, config.min_delay_ms)
        };
        Self {
            template: config.reply_template.clone(),
            min_delay_ms,
            max_delay_ms,
        }
    }

    /// Reply text for `user_text`. Deterministic.
    pub fn compose_reply(&self, user_text: &str) -> String {
        self.template.replace("{message}", user_text.trim())
    }

    /// Latency for the next reply, uniformly within the configured bounds.
    pub fn next_delay(&self) -> Duration {
        let ms = if self.min_delay_ms == self.max_delay_ms {
            self.min_delay_ms
        } else {
            rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms)
        };
        Duration::from_millis(ms)
    }

    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Default for ResponseSimulator {
    fn default() -> Self {
        Self::new(&SimulatorConfig::default())
    }
}

#[async_trait]
impl Responder for ResponseSimulator {
    async fn respond_to(&self, user_text: &str) -> Result<String, ChatError> {
        let delay = self.next_delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Simulating reply latency");
        // Yield even for a zero delay so callers always see a pending state.
        tokio::task::yield_now().await;
        tokio::time::sleep(delay).await;
        Ok(self.compose_reply(user_text))
    }
}

// =============================================================================
// Tests
// =============================================================================
