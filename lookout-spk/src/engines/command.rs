//! External program TTS engine

use crate::config::{CommandEngineConfig, VoiceConfig};
use crate::engines::{sanitize_text, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Argument placeholder replaced by the utterance
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Runs a configured program once per utterance, without a shell
pub struct CommandTtsEngine {
    config: CommandEngineConfig,
}

impl CommandTtsEngine {
    pub fn new(config: CommandEngineConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;
        Ok(Self { config })
    }

    /// Arguments with the placeholder substituted, or the text appended
    fn render_args(&self, text: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|a| a.replace(TEXT_PLACEHOLDER, text))
            .collect();

        if !self.config.args.iter().any(|a| a.contains(TEXT_PLACEHOLDER)) {
            args.push(text.to_string());
        }
        args
    }
}

#[async_trait]
impl TtsEngine for CommandTtsEngine {
    async fn speak(&self, text: &str, _voice: &VoiceConfig) -> Result<(), SpeechError> {
        let text = sanitize_text(text)?;
        debug!("Speaking {:?} through {}", text, self.config.program);

        let output = Command::new(&self.config.program)
            .args(self.render_args(&text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), output)
            .await
            .map_err(|_| {
                SpeechError::Engine(format!(
                    "{} timed out after {}s",
                    self.config.program, self.config.timeout_secs
                ))
            })?
            .map_err(|e| SpeechError::Engine(format!("Failed to run {}: {}", self.config.program, e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        Ok(vec![])
    }

    fn is_available(&self) -> bool {
        on_path(&self.config.program)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Whether `program` resolves to an existing file, directly or through PATH
fn on_path(program: &str) -> bool {
    let path = std::path::Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }

    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                let candidate = dir.join(program);
                candidate.is_file() || candidate.with_extension("exe").is_file()
            })
        })
        .unwrap_or(false)
}
