//! Configuration for announcement and alert behavior

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder replaced by the detected label in the announcement template
pub const LABEL_PLACEHOLDER: &str = "{label}";

/// Assistant behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Seconds during which a label is not announced again
    pub memory_window_secs: u64,
    /// Announcement text; `{label}` is replaced by the detected label
    pub announce_template: String,
    /// Drop expired labels from memory after every frame
    pub evict_expired_memory: bool,
    /// Pause between frames in milliseconds
    pub frame_pause_ms: u64,
    /// Special-case alert
    pub alert: AlertConfig,
}

/// Special-case alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Enable the alert
    pub enabled: bool,
    /// Case-insensitive label substrings that trigger the alert
    pub keywords: Vec<String>,
    /// Minimum seconds between spoken alerts
    pub cooldown_secs: u64,
    /// Spoken alert
    pub message: String,
    /// Overlay text shown while a trigger object is in frame
    pub banner: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            memory_window_secs: 10,
            announce_template: "I see a {label}".to_string(),
            evict_expired_memory: false,
            frame_pause_ms: 10,
            alert: AlertConfig::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keywords: vec!["charger".to_string(), "cell phone".to_string()],
            cooldown_secs: 5,
            message: "Charger detected! Please connect your device.".to_string(),
            banner: "CHARGER DETECTED!".to_string(),
        }
    }
}

impl AssistantConfig {
    pub fn memory_window(&self) -> Duration {
        Duration::from_secs(self.memory_window_secs)
    }

    pub fn frame_pause(&self) -> Duration {
        Duration::from_millis(self.frame_pause_ms)
    }

    /// Render the announcement for `label`
    pub fn announcement(&self, label: &str) -> String {
        self.announce_template.replace(LABEL_PLACEHOLDER, label)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.memory_window_secs == 0 {
            return Err("Memory window must be at least 1 second".to_string());
        }

        if self.memory_window_secs > 86_400 {
            return Err("Memory window too large (max 86400 seconds)".to_string());
        }

        if !self.announce_template.contains(LABEL_PLACEHOLDER) {
            return Err(format!("Announcement template must contain {}", LABEL_PLACEHOLDER));
        }

        if self.frame_pause_ms > 1000 {
            return Err("Frame pause too large (max 1000 ms)".to_string());
        }

        self.alert.validate()
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }

        if self.cooldown_secs == 0 {
            return Err("Alert cooldown must be at least 1 second".to_string());
        }

        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err("Alert needs at least one non-empty keyword".to_string());
        }

        if self.message.trim().is_empty() {
            return Err("Alert message cannot be empty".to_string());
        }

        Ok(())
    }
}
