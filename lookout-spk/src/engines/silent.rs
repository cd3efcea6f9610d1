//! Engine that discards everything

use crate::config::VoiceConfig;
use crate::engines::TtsEngine;
use crate::error::SpeechError;
use async_trait::async_trait;
use tracing::debug;

/// Used when speech is muted or disabled
#[derive(Debug, Default)]
pub struct SilentTtsEngine;

impl SilentTtsEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TtsEngine for SilentTtsEngine {
    async fn speak(&self, text: &str, _voice: &VoiceConfig) -> Result<(), SpeechError> {
        debug!("(muted) {}", text);
        Ok(())
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        Ok(vec![])
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}
