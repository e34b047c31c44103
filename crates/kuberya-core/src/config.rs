use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{KuberyaError, Result};

/// Top-level configuration for Kuberya.
///
/// Loaded from `~/.kuberya/config.toml` by default. Each section corresponds
/// to one component of the conversation front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KuberyaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub support: SupportConfig,
}

impl KuberyaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: KuberyaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| KuberyaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Product name shown in prompts and the persona sentence.
    pub app_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            app_name: "Kuberya Bot".to_string(),
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Text used for a user message that carries attachments but no text.
    pub attachment_placeholder: String,
    /// History titles longer than this many characters are cut and get `...`.
    pub title_max_chars: usize,
    /// History summaries longer than this many characters are cut and get `...`.
    pub summary_max_chars: usize,
    /// Upper bound on a single reply. `None` waits forever.
    pub reply_timeout_ms: Option<u64>,
    /// Thread text shown when a reply fails.
    pub failure_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            attachment_placeholder: "Sent an attachment".to_string(),
            title_max_chars: 50,
            summary_max_chars: 100,
            reply_timeout_ms: None,
            failure_message: "Sorry, I couldn't get a reply. Please try again.".to_string(),
        }
    }
}

/// Response simulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Reply template. `{message}` is replaced with the user's text.
    pub reply_template: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            reply_template: "I understand your question about \"{message}\". Let me help you \
                             with that. As Kuberya Bot, I'm designed to assist students with \
                             their learning needs. Could you provide more specific details \
                             about what you'd like to learn or discuss?"
                .to_string(),
        }
    }
}

/// History ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Start with the sample conversations the product ships with.
    pub seed_demo_entries: bool,
    /// chrono format string for `created_at_display`.
    pub timestamp_format: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            seed_demo_entries: true,
            timestamp_format: "%B %-d, %Y at %-I:%M %p".to_string(),
        }
    }
}

/// One selectable assistant variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub label: String,
    pub description: String,
}

impl ModelProfile {
    fn new(label: &str, description: &str) -> Self {
        Self {
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

/// Model selector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub default_model: String,
    pub catalog: Vec<ModelProfile>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: "Mentify 1".to_string(),
            catalog: vec![
                ModelProfile::new("Mentify 1", "General purpose AI assistant"),
                ModelProfile::new("Mentify 2", "Fast and efficient responses"),
                ModelProfile::new("Mentify 3", "Advanced reasoning and analysis"),
                ModelProfile::new("Mentify 4", "Creative and innovative solutions"),
            ],
        }
    }
}

/// Voice agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Audio level refresh interval for the visualizer.
    pub meter_interval_ms: u64,
    /// Number of visualizer bars.
    pub bar_count: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            meter_interval_ms: 150,
            bar_count: 5,
        }
    }
}

/// Customer-support widget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub greeting: String,
    pub canned_reply: String,
    pub reply_delay_ms: u64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            greeting: "Hi! I'm here to help you with any questions about Kuberya Bot. \
                       How can I assist you today?"
                .to_string(),
            canned_reply: "Thank you for your message! Our support team will get back to you \
                           shortly. In the meantime, you can check our FAQ section for common \
                           questions."
                .to_string(),
            reply_delay_ms: 1000,
        }
    }
}
