//! Application configuration
//!
//! Read from a TOML file when one exists, otherwise defaults. The watchdog
//! deadline is always derived from the bot-ready timeout, never configured
//! on its own.

use crate::error::{DemoError, Result};
use crate::transport::SimulationConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Time normally allowed for the agent to become ready
pub const DEFAULT_BOT_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Environment variable naming a config file
pub const CONFIG_PATH_ENV: &str = "VOICE_DEMO_CONFIG";

/// Environment variable overriding the bot-ready timeout, in milliseconds
pub const BOT_READY_TIMEOUT_ENV: &str = "VOICE_DEMO_BOT_READY_TIMEOUT_MS";

/// UI colour scheme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

/// Configuration for the voice demo
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Base time allowed for the agent to become ready
    pub bot_ready_timeout_ms: u64,

    /// Agent service endpoint handed to the transport
    pub agent_url: String,

    /// UI colour scheme
    pub theme: ThemeChoice,

    /// Simulated transport behaviour
    pub simulation: SimulationConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            bot_ready_timeout_ms: DEFAULT_BOT_READY_TIMEOUT.as_millis() as u64,
            agent_url: "http://localhost:7860/api".to_string(),
            theme: ThemeChoice::Dark,
            simulation: SimulationConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Base bot-ready timeout
    pub fn bot_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.bot_ready_timeout_ms)
    }

    /// Watchdog deadline: twice the bot-ready timeout
    pub fn extended_timeout(&self) -> Duration {
        self.bot_ready_timeout() * 2
    }

    /// Set the bot-ready timeout
    pub fn with_bot_ready_timeout(mut self, timeout: Duration) -> Self {
        self.bot_ready_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the agent endpoint
    pub fn with_agent_url(mut self, url: impl Into<String>) -> Self {
        self.agent_url = url.into();
        self
    }

    /// Set the simulated transport behaviour
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DemoConfig = toml::from_str(content)
            .map_err(|e| DemoError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DemoError::IOError(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            DemoError::ConfigError(msg) => {
                DemoError::ConfigError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Per-user config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voice-demo").join("config.toml"))
    }

    /// Load from `$VOICE_DEMO_CONFIG`, the per-user file, or defaults,
    /// then apply environment overrides
    pub fn load_from_env() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::load(path)?
            }
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    info!("Loading config from {}", path.display());
                    Self::load(path)?
                }
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        let timeout_override = std::env::var(BOT_READY_TIMEOUT_ENV).ok();
        config.apply_timeout_override(timeout_override.as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply a bot-ready timeout override given in milliseconds
    pub fn apply_timeout_override(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(raw) = value {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                DemoError::ConfigError(format!(
                    "Invalid {} '{}': {}",
                    BOT_READY_TIMEOUT_ENV, raw, e
                ))
            })?;
            self.bot_ready_timeout_ms = ms;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bot_ready_timeout_ms == 0 {
            return Err(DemoError::ConfigError(
                "bot_ready_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.agent_url.trim().is_empty() {
            return Err(DemoError::ConfigError("agent_url is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DemoConfig::default();
        assert_eq!(config.bot_ready_timeout(), Duration::from_secs(15));
        assert_eq!(config.extended_timeout(), Duration::from_secs(30));
        assert_eq!(config.theme, ThemeChoice::Dark);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DemoConfig::default()
            .with_bot_ready_timeout(Duration::from_millis(500))
            .with_agent_url("https://agent.example/api");

        assert_eq!(config.extended_timeout(), Duration::from_millis(1000));
        assert_eq!(config.agent_url, "https://agent.example/api");
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            bot_ready_timeout_ms = 8000
            theme = "light"

            [simulation]
            fail_starts = 2
            bot_joins = false
        "#;

        let config = DemoConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.bot_ready_timeout_ms, 8000);
        assert_eq!(config.theme, ThemeChoice::Light);
        assert_eq!(config.simulation.fail_starts, 2);
        assert!(!config.simulation.bot_joins);
        // Unspecified fields keep their defaults
        assert_eq!(config.agent_url, DemoConfig::default().agent_url);
        assert_eq!(
            config.simulation.handshake_delay_ms,
            SimulationConfig::default().handshake_delay_ms
        );
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = DemoConfig::from_toml_str("bot_ready_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, DemoError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(DemoConfig::from_toml_str("theme = \"sepia\"").is_err());
    }

    #[test]
    fn test_timeout_override() {
        let mut config = DemoConfig::default();
        config.apply_timeout_override(None).unwrap();
        assert_eq!(config.bot_ready_timeout_ms, 15_000);

        config.apply_timeout_override(Some(" 2500 ")).unwrap();
        assert_eq!(config.extended_timeout(), Duration::from_millis(5000));

        assert!(config.apply_timeout_override(Some("soon")).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = DemoConfig::load("/nonexistent/voice-demo.toml").unwrap_err();
        assert!(matches!(err, DemoError::IOError(_)));
    }
}
