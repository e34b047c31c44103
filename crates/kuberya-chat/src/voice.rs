//! Voice agent.
//!
//! Tracks the listening flag and drives a simulated input level for the
//! visualizer. No audio is captured and nothing is transcribed.

use std::sync::Arc;
use std::time::Duration;

use kuberya_core::config::VoiceConfig;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ChatError;

/// Smallest bar height the visualizer draws.
pub const MIN_BAR_HEIGHT: u32 = 8;

/// Visualizer bar heights for an input `level`.
pub fn bar_heights(level: u32, bars: usize) -> Vec<u32> {
    (0..bars as u32)
        .map(|i| ((level + i * 10) % 40).max(MIN_BAR_HEIGHT))
        .collect()
}

/// Listening state plus the level meter shown while voice mode is active.
#[derive(Debug)]
pub struct VoiceAgent {
    listening: bool,
    meter_interval: Duration,
    bar_count: usize,
    level_tx: Arc<watch::Sender<u32>>,
    meter: Option<JoinHandle<()>>,
}

impl VoiceAgent {
    pub fn new(config: &VoiceConfig) -> Self {
        let (level_tx, _) = watch::channel(0);
        Self {
            listening: false,
            meter_interval: Duration::from_millis(config.meter_interval_ms.max(1)),
            bar_count: config.bar_count,
            level_tx: Arc::new(level_tx),
            meter: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn start_listening(&mut self) -> Result<(), ChatError> {
        if self.listening {
            return Err(ChatError::VoiceError("already listening".to_string()));
        }
        self.listening = true;
        tracing::debug!("Voice agent listening");
        Ok(())
    }

    /// Stop listening. Nothing is transcribed, so the result is always `None`.
    pub fn stop_listening(&mut self) -> Result<Option<String>, ChatError> {
        if !self.listening {
            return Err(ChatError::VoiceError("not listening".to_string()));
        }
        self.listening = false;
        tracing::debug!("Voice agent stopped listening");
        Ok(None)
    }

    /// Flip the listening flag. Returns the new state.
    pub fn toggle_listening(&mut self) -> bool {
        self.listening = !self.listening;
        self.listening
    }

    // ---- Level meter ----

    /// Start publishing a random level every meter interval. Restarts the
    /// meter if it is already running. Needs a tokio runtime.
    pub fn start_meter(&mut self) {
        self.stop_meter();
        let tx = Arc::clone(&self.level_tx);
        let mut ticker = tokio::time::interval(self.meter_interval);
        self.meter = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let level = rand::rng().random_range(0..100);
                tx.send_replace(level);
            }
        }));
        tracing::debug!(interval_ms = self.meter_interval.as_millis() as u64, "Level meter started");
    }

    pub fn stop_meter(&mut self) {
        if let Some(handle) = self.meter.take() {
            handle.abort();
            tracing::debug!("Level meter stopped");
        }
    }

    pub fn is_metering(&self) -> bool {
        self.meter.is_some()
    }

    pub fn level(&self) -> u32 {
        *self.level_tx.borrow()
    }

    pub fn subscribe_level(&self) -> watch::Receiver<u32> {
        self.level_tx.subscribe()
    }

    /// Bar heights for the current level.
    pub fn bars(&self) -> Vec<u32> {
        bar_heights(self.level(), self.bar_count)
    }

    // ---- Labels ----

    pub fn status_line(&self) -> &'static str {
        if self.listening {
            "Listening..."
        } else {
            "Voice Agent Active"
        }
    }

    pub fn hint_line(&self) -> &'static str {
        if self.listening {
            "Speak now, I'm listening"
        } else {
            "Click the microphone to start speaking"
        }
    }

    /// Stop listening and the meter. Idempotent.
    pub fn shutdown(&mut self) {
        self.listening = false;
        self.stop_meter();
    }
}

impl Default for VoiceAgent {
    fn default() -> Self {
        Self::new(&VoiceConfig::default())
    }
}

impl Drop for VoiceAgent {
    fn drop(&mut self) {
        self.stop_meter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_heights() {
        assert_eq!(bar_heights(0, 5), vec![8, 10, 20, 30, 8]);
        assert_eq!(bar_heights(35, 5), vec![35, 8, 15, 25, 35]);
        assert!(bar_heights(99, 0).is_empty());
    }

    #[test]
    fn test_bar_heights_never_below_minimum() {
        for level in 0..100 {
            assert!(bar_heights(level, 5).iter().all(|h| *h >= MIN_BAR_HEIGHT && *h < 40));
        }
    }

    #[test]
    fn test_listening_transitions() {
        let mut agent = VoiceAgent::default();
        assert!(!agent.is_listening());
        assert_eq!(agent.status_line(), "Voice Agent Active");

        agent.start_listening().unwrap();
        assert_eq!(agent.status_line(), "Listening...");
        let err = agent.start_listening().unwrap_err();
        assert!(err.to_string().contains("already listening"));

        assert_eq!(agent.stop_listening().unwrap(), None);
        let err = agent.stop_listening().unwrap_err();
        assert!(err.to_string().contains("not listening"));
    }

    #[test]
    fn test_toggle_listening() {
        let mut agent = VoiceAgent::default();
        assert!(agent.toggle_listening());
        assert_eq!(agent.hint_line(), "Speak now, I'm listening");
        assert!(!agent.toggle_listening());
    }

    #[tokio::test(start_paused = true)]
    async fn test_meter_publishes_levels() {
        let mut agent = VoiceAgent::default();
        let mut rx = agent.subscribe_level();
        agent.start_meter();
        assert!(agent.is_metering());

        for _ in 0..3 {
            rx.changed().await.unwrap();
            assert!(*rx.borrow_and_update() < 100);
        }
        assert_eq!(agent.bars().len(), 5);

        agent.stop_meter();
        assert!(!agent.is_metering());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_meter_goes_quiet() {
        let mut agent = VoiceAgent::default();
        let mut rx = agent.subscribe_level();
        agent.start_meter();
        rx.changed().await.unwrap();
        agent.stop_meter();
        rx.borrow_and_update();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_resets_everything() {
        let mut agent = VoiceAgent::default();
        agent.start_listening().unwrap();
        agent.start_meter();
        agent.shutdown();
        agent.shutdown();
        assert!(!agent.is_listening());
        assert!(!agent.is_metering());
    }
}
