//! Layered application configuration: file, then `LOOKOUT_*` environment, then flags

use anyhow::{anyhow, bail, Context, Result};
use lookout_core::AssistantConfig;
use lookout_eye::VisionConfig;
use lookout_spk::SpeechConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the `lookout` binary can be configured with
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    pub vision: VisionConfig,
    pub speech: SpeechConfig,
    pub assistant: AssistantConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            vision: VisionConfig::default(),
            speech: SpeechConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a file; the format follows the extension, otherwise each one is tried
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config = match extension.as_deref() {
            Some("toml") => toml::from_str(&content).map_err(anyhow::Error::from),
            Some("json") => serde_json::from_str(&content).map_err(anyhow::Error::from),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(anyhow::Error::from),
            _ => Self::from_str(&content),
        };
        config.with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Parse JSON, TOML or YAML, whichever matches first
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = toml::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        if let Ok(config) = serde_yaml::from_str::<AppConfig>(content) {
            return Ok(config);
        }

        Err(anyhow!("Unknown config format"))
    }

    /// Override settings from `LOOKOUT_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(camera) = var("LOOKOUT_CAMERA") {
            self.vision.camera_id = parse_var("LOOKOUT_CAMERA", &camera)?;
        }

        if let Some(dir) = var("LOOKOUT_MODEL_DIR") {
            self.vision.model_path = PathBuf::from(dir);
        }

        if let Some(window) = var("LOOKOUT_MEMORY_WINDOW_SECS") {
            self.assistant.memory_window_secs = parse_var("LOOKOUT_MEMORY_WINDOW_SECS", &window)?;
        }

        if let Some(cooldown) = var("LOOKOUT_ALERT_COOLDOWN_SECS") {
            self.assistant.alert.cooldown_secs = parse_var("LOOKOUT_ALERT_COOLDOWN_SECS", &cooldown)?;
        }

        if let Some(enabled) = var("LOOKOUT_SPEECH") {
            self.speech.enabled = parse_var("LOOKOUT_SPEECH", &enabled)?;
        }

        if let Some(level) = var("LOOKOUT_LOG_LEVEL") {
            self.log_level = level;
        }

        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            bail!("log_level cannot be empty");
        }
        self.vision.validate().map_err(|e| anyhow!("vision: {}", e))?;
        self.speech.validate().map_err(|e| anyhow!("speech: {}", e))?;
        self.assistant.validate().map_err(|e| anyhow!("assistant: {}", e))?;
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {}={:?}: {}", key, value, e))
}
