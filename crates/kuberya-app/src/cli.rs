//! CLI argument definitions for the Kuberya terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Kuberya Bot, a conversational assistant in your terminal.
#[derive(Parser, Debug)]
#[command(name = "kuberya", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Model label to start with.
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Start in dark mode.
    #[arg(long = "dark")]
    pub dark: bool,

    /// Start with an empty history sidebar.
    #[arg(long = "no-demo-history")]
    pub no_demo_history: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > KUBERYA_CONFIG env var > ~/.kuberya/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("KUBERYA_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log filter.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".kuberya").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".kuberya").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "kuberya",
            "--config",
            "/tmp/k.toml",
            "--model",
            "Mentify 2",
            "--dark",
            "--no-demo-history",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/k.toml"));
        assert_eq!(args.model.as_deref(), Some("Mentify 2"));
        assert!(args.dark);
        assert!(args.no_demo_history);
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::parse_from(["kuberya"]);
        assert_eq!(args.resolve_log_level("warn"), "warn");
        let args = CliArgs::parse_from(["kuberya", "-l", "debug"]);
        assert_eq!(args.resolve_log_level("warn"), "debug");
    }
}
