//! TTS engine implementations

pub mod native;
pub mod command;
pub mod custom;
pub mod silent;

use crate::config::{SpeechConfig, TtsEngineKind, VoiceConfig};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use command::CommandTtsEngine;
pub use custom::CustomTtsEngine;
pub use native::NativeTtsEngine;
pub use silent::SilentTtsEngine;

/// Longest utterance an engine accepts
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Trait for TTS engines
///
/// `speak` returns once the utterance has finished playing, so a caller
/// awaiting it in a loop never overlaps two utterances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Speak `text` aloud and wait for it to finish
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError>;

    /// Get available voices
    async fn list_voices(&self) -> Result<Vec<String>, SpeechError>;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &'static str;
}

/// Build the engine selected by `config`
///
/// Disabled speech yields the silent engine. An enabled engine that cannot
/// run on this machine is an error rather than a silent fallback.
pub fn create_engine(config: &SpeechConfig) -> Result<Arc<dyn TtsEngine>, SpeechError> {
    if !config.enabled {
        info!("Speech disabled, using silent engine");
        return Ok(Arc::new(SilentTtsEngine::new()));
    }

    let engine: Arc<dyn TtsEngine> = match config.engine {
        TtsEngineKind::Native => Arc::new(NativeTtsEngine::new_with_config(
            config.rate,
            config.volume,
            config.pitch,
        )),
        TtsEngineKind::Command => {
            let command = config.command.clone().ok_or_else(|| {
                SpeechError::Config("Command engine selected but no command configured".to_string())
            })?;
            Arc::new(CommandTtsEngine::new(command)?)
        }
        TtsEngineKind::Silent => Arc::new(SilentTtsEngine::new()),
    };

    if !engine.is_available() {
        return Err(SpeechError::Engine(format!(
            "{} TTS engine not available",
            engine.name()
        )));
    }

    info!("Using {} TTS engine", engine.name());
    Ok(engine)
}

/// Strip control characters and leading dashes, then bound the length
///
/// Leading dashes would otherwise be read as options by the engine front ends.
pub(crate) fn sanitize_text(text: &str) -> Result<String, SpeechError> {
    if text.len() > MAX_TEXT_LENGTH {
        return Err(SpeechError::Engine(format!(
            "Text too long ({} bytes, max {} bytes)",
            text.len(),
            MAX_TEXT_LENGTH
        )));
    }

    let sanitized: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .trim_start_matches('-')
        .trim_start()
        .to_string();

    if sanitized.is_empty() {
        return Err(SpeechError::Engine("Text is empty after sanitization".to_string()));
    }

    Ok(sanitized)
}
