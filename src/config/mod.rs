// ABOUTME: Application configuration loaded from TOML with defaults for every key
// Covers API endpoints, chat transport timing, display locale and the wall-clock invariant

use crate::chat::grouping::Locale;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub chat: ChatConfig,
    pub display: DisplayConfig,
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://build-better.site/api/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Room id is appended as the last path segment.
    pub ws_base_url: String,
    pub token_in_query: bool,
    pub sender_role: String,
    pub keepalive_interval_secs: u64,
    pub keepalive_timeout_secs: Option<u64>,
    pub reconnect_delay_secs: u64,
    pub max_reconnect_attempts: Option<u32>,
    pub reconnect_ceiling_secs: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "wss://build-better.site/ws/chat".to_string(),
            token_in_query: true,
            sender_role: "architect".to_string(),
            keepalive_interval_secs: 30,
            keepalive_timeout_secs: None,
            reconnect_delay_secs: 5,
            max_reconnect_attempts: None,
            reconnect_ceiling_secs: None,
        }
    }
}

impl ChatConfig {
    pub fn room_url(&self, room_id: &str) -> String {
        format!("{}/{}", self.ws_base_url.trim_end_matches('/'), room_id)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }

    pub fn keepalive_timeout(&self) -> Option<Duration> {
        self.keepalive_timeout_secs.map(Duration::from_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            delay: Duration::from_secs(self.reconnect_delay_secs),
            max_attempts: self.max_reconnect_attempts,
            ceiling: self.reconnect_ceiling_secs.map(Duration::from_secs),
        }
    }
}

/// Backoff between reconnection attempts. With no cap and no ceiling this
/// retries at a fixed delay until the session is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
    /// When set, the delay doubles per attempt up to this value.
    pub ceiling: Option<Duration>,
}

impl ReconnectPolicy {
    /// `attempt` is 1-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.ceiling {
            None => self.delay,
            Some(ceiling) => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor).min(ceiling)
            }
        }
    }

    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ChatConfig::default().reconnect_policy()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Backend timestamps carry no usable zone; they are read as local wall-clock
    /// time. Set to false when the backend is known to run in another zone: times
    /// are still read the same way, but sessions log that they may be off.
    pub server_shares_wall_clock: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            server_shares_wall_clock: crate::chat::timestamp::SHARED_WALL_CLOCK,
        }
    }
}

impl AppConfig {
    /// `<config_dir>/consult-chat/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("consult-chat").join("config.toml"))
    }

    /// Load from the default location. A missing file means defaults.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config directory; using default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
