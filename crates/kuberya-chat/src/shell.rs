//! Application shell.
//!
//! Wires the session manager, history ledger, voice agent and support desk
//! together behind the login gate, and owns the cosmetic state (theme,
//! selected model).

use std::sync::Arc;

use kuberya_core::config::{KuberyaConfig, ModelProfile};
use kuberya_core::error::{KuberyaError, Result};
use kuberya_core::events::SessionEvent;
use kuberya_core::types::{ChatMode, ModelLabel, Theme};
use tokio::sync::broadcast;

use crate::history::HistoryLedger;
use crate::session::{SessionManager, EVENT_CHANNEL_CAPACITY};
use crate::simulator::{Responder, ResponseSimulator};
use crate::support::SupportDesk;
use crate::voice::VoiceAgent;

/// Shown for labels missing from the model catalog.
pub const FALLBACK_MODEL_DESCRIPTION: &str = "AI Assistant";

pub struct AppShell {
    logged_in: bool,
    theme: Theme,
    session: SessionManager,
    ledger: Arc<HistoryLedger>,
    voice: VoiceAgent,
    support: SupportDesk,
    catalog: Vec<ModelProfile>,
    events: broadcast::Sender<SessionEvent>,
}

impl AppShell {
    /// Build the shell around `responder`. Starts logged out, in chat mode.
    pub fn new(config: &KuberyaConfig, responder: Arc<dyn Responder>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let ledger = Arc::new(HistoryLedger::from_config(config).with_events(events.clone()));
        let session = SessionManager::new(
            config.chat.clone(),
            responder,
            Arc::clone(&ledger),
            ModelLabel::new(config.models.default_model.clone()),
            events.clone(),
        );
        Self {
            logged_in: false,
            theme: Theme::default(),
            session,
            ledger,
            voice: VoiceAgent::new(&config.voice),
            support: SupportDesk::new(&config.support),
            catalog: config.models.catalog.clone(),
            events,
        }
    }

    /// Shell backed by the local reply simulator.
    pub fn with_simulator(config: &KuberyaConfig) -> Self {
        Self::new(config, Arc::new(ResponseSimulator::new(&config.simulator)))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ---- Login gate ----

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn login(&mut self) {
        self.logged_in = true;
        tracing::info!("Logged in");
    }

    /// Leave the app: the conversation is reset, history and its selection
    /// are cleared, the mode returns to chat and voice capture stops.
    pub fn logout(&mut self) {
        self.session.start_new_conversation();
        self.ledger.clear_all();
        self.ledger.clear_selection();
        self.session.set_mode(ChatMode::Chat);
        self.voice.shutdown();
        self.logged_in = false;
        tracing::info!("Logged out");
    }

    /// The session manager, only while logged in.
    pub fn session(&self) -> Result<&SessionManager> {
        if self.logged_in {
            Ok(&self.session)
        } else {
            Err(KuberyaError::NotLoggedIn)
        }
    }

    /// The history ledger, only while logged in.
    pub fn history(&self) -> Result<&HistoryLedger> {
        if self.logged_in {
            Ok(&self.ledger)
        } else {
            Err(KuberyaError::NotLoggedIn)
        }
    }

    // ---- Conversation ----

    /// Start a fresh conversation and drop the history highlight.
    pub fn new_chat(&self) -> Result<()> {
        let session = self.session()?;
        session.start_new_conversation();
        self.ledger.clear_selection();
        Ok(())
    }

    /// Switch between chat and voice. Entering voice starts the level meter,
    /// leaving it stops the meter and listening.
    pub fn toggle_voice(&mut self) -> Result<ChatMode> {
        let mode = self.session()?.toggle_mode();
        match mode {
            ChatMode::Voice => self.voice.start_meter(),
            ChatMode::Chat => self.voice.shutdown(),
        }
        Ok(mode)
    }

    pub fn voice(&self) -> &VoiceAgent {
        &self.voice
    }

    pub fn voice_mut(&mut self) -> &mut VoiceAgent {
        &mut self.voice
    }

    pub fn support(&self) -> &SupportDesk {
        &self.support
    }

    pub fn support_mut(&mut self) -> &mut SupportDesk {
        &mut self.support
    }

    // ---- Theme ----

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn is_dark_mode(&self) -> bool {
        self.theme.is_dark()
    }

    // ---- Model selector ----

    /// Use `label` for interactions completing from now on. Not validated
    /// against the catalog.
    pub fn select_model(&self, label: impl Into<String>) {
        let label = ModelLabel::new(label);
        tracing::debug!(model = %label, "Model selected");
        self.session.set_model_label(label);
    }

    pub fn selected_model(&self) -> ModelLabel {
        self.session.model_label()
    }

    pub fn models(&self) -> &[ModelProfile] {
        &self.catalog
    }

    pub fn model_description(&self, label: &str) -> &str {
        self.catalog
            .iter()
            .find(|m| m.label == label)
            .map_or(FALLBACK_MODEL_DESCRIPTION, |m| m.description.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuberya_core::config::SimulatorConfig;

    fn config() -> KuberyaConfig {
        let mut config = KuberyaConfig::default();
        config.simulator = SimulatorConfig {
            min_delay_ms: 1000,
            max_delay_ms: 1000,
            ..SimulatorConfig::default()
        };
        config
    }

    fn logged_in() -> AppShell {
        let mut shell = AppShell::with_simulator(&config());
        shell.login();
        shell
    }

    #[test]
    fn test_session_gated_by_login() {
        let mut shell = AppShell::with_simulator(&config());
        assert!(matches!(shell.session(), Err(KuberyaError::NotLoggedIn)));
        assert!(shell.history().is_err());
        shell.login();
        assert!(shell.session().is_ok());
    }

    #[test]
    fn test_seeded_history_visible_after_login() {
        let shell = logged_in();
        let history = shell.history().unwrap();
        assert_eq!(history.len(), 8);
        assert!(history.active().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_resets_everything() {
        let mut shell = logged_in();
        shell.toggle_voice().unwrap();
        shell.voice_mut().start_listening().unwrap();
        let session = shell.session().unwrap();
        session.submit("hello").into_pending().unwrap().wait().await;

        shell.logout();
        assert!(!shell.is_logged_in());

        shell.login();
        let session = shell.session().unwrap();
        assert!(session.messages().is_empty());
        assert_eq!(session.mode(), ChatMode::Chat);
        assert!(shell.history().unwrap().is_empty());
        assert!(shell.history().unwrap().active().is_none());
        assert!(!shell.voice().is_listening());
        assert!(!shell.voice().is_metering());
    }

    #[test]
    fn test_theme_toggle() {
        let mut shell = logged_in();
        assert!(!shell.is_dark_mode());
        assert_eq!(shell.toggle_theme(), Theme::Dark);
        assert!(shell.is_dark_mode());
        shell.logout();
        assert!(shell.is_dark_mode());
    }

    #[test]
    fn test_model_description_lookup() {
        let shell = logged_in();
        assert_eq!(shell.model_description("Mentify 3"), "Advanced reasoning and analysis");
        assert_eq!(shell.model_description("Unknown"), FALLBACK_MODEL_DESCRIPTION);
        assert_eq!(shell.models().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selected_model_recorded_in_history() {
        let shell = logged_in();
        shell.select_model("Custom Model");
        assert_eq!(shell.selected_model().as_str(), "Custom Model");
        let session = shell.session().unwrap();
        session.submit("hi").into_pending().unwrap().wait().await;
        let first = shell.history().unwrap().nth(0).unwrap();
        assert_eq!(first.model_label.as_str(), "Custom Model");
    }

    #[test]
    fn test_new_chat_clears_selection() {
        let shell = logged_in();
        shell.new_chat().unwrap();
        assert!(shell.history().unwrap().active().is_none());
        assert_eq!(shell.history().unwrap().len(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_voice_drives_meter() {
        let mut shell = logged_in();
        assert_eq!(shell.toggle_voice().unwrap(), ChatMode::Voice);
        assert!(shell.voice().is_metering());
        assert_eq!(shell.toggle_voice().unwrap(), ChatMode::Chat);
        assert!(!shell.voice().is_metering());
    }
}
