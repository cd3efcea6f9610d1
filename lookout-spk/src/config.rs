//! Configuration for spoken output

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speak announcements aloud (when false, utterances are dropped silently)
    pub enabled: bool,

    /// TTS engine
    pub engine: TtsEngineKind,

    /// Voice settings
    pub voice: VoiceConfig,

    /// Speech rate (words per minute, 0-500, default 150)
    pub rate: u32,

    /// Volume (0.0-1.0, default 0.8)
    pub volume: f32,

    /// Pitch adjustment (-1.0 to 1.0, default 0.0)
    pub pitch: f32,

    /// How long the worker waits for an utterance before rechecking shutdown
    pub poll_interval_ms: u64,

    /// External program settings, required when `engine` is `Command`
    pub command: Option<CommandEngineConfig>,
}

/// TTS engine type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TtsEngineKind {
    /// Platform TTS (macOS say, Linux espeak-ng, Windows System.Speech)
    Native,
    /// User-supplied program that speaks its input
    Command,
    /// Discard every utterance
    Silent,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier
    pub name: Option<String>,

    /// Language code (e.g., "en-US", "es-ES")
    pub language: String,
}

/// External TTS program
///
/// Each argument may contain `{text}`, which is replaced by the utterance.
/// When no argument does, the utterance is passed as the last argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandEngineConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Kill the program if one utterance takes longer than this
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    30
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: TtsEngineKind::Native,
            voice: VoiceConfig::default(),
            rate: 150,
            volume: 0.8,
            pitch: 0.0,
            poll_interval_ms: 1000,
            command: None,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en-US".to_string(),
        }
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }

        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters (only alphanumeric and '-' allowed)".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err("Voice name cannot be empty if provided".to_string());
            }

            if name.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }

            if name.chars().any(|c| c == '\0' || c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}

impl CommandEngineConfig {
    /// Validate command configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("Command program cannot be empty".to_string());
        }

        if self.program.contains('\0') || self.args.iter().any(|a| a.contains('\0')) {
            return Err("Command contains null bytes".to_string());
        }

        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err("Command timeout must be between 1 and 600 seconds".to_string());
        }

        Ok(())
    }
}

impl SpeechConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rate > 500 {
            return Err("Speech rate must be between 0 and 500 WPM".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if !(-1.0..=1.0).contains(&self.pitch) {
            return Err("Pitch must be between -1.0 and 1.0".to_string());
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > 60_000 {
            return Err("Poll interval must be between 1 and 60000 ms".to_string());
        }

        self.voice.validate()?;

        if self.engine == TtsEngineKind::Command {
            match self.command {
                Some(ref command) => command.validate()?,
                None => return Err("Command engine selected but no command configured".to_string()),
            }
        }

        Ok(())
    }
}
