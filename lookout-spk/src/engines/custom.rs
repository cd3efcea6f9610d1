//! Custom TTS engine implementation
//! Lets callers plug in their own speech backend

use crate::config::VoiceConfig;
use crate::engines::{TtsEngine, MAX_TEXT_LENGTH};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::sync::Arc;

type SpeakFn = Arc<dyn Fn(&str, &VoiceConfig) -> Result<(), SpeechError> + Send + Sync>;
type ListVoicesFn = Arc<dyn Fn() -> Result<Vec<String>, SpeechError> + Send + Sync>;
type IsAvailableFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Custom TTS engine wrapper
///
/// The speak function may block until the utterance finishes; it runs on the
/// blocking thread pool so the worker's runtime stays responsive.
pub struct CustomTtsEngine {
    name: &'static str,
    speak_fn: SpeakFn,
    list_voices_fn: ListVoicesFn,
    is_available_fn: IsAvailableFn,
}

impl CustomTtsEngine {
    /// Create a new custom TTS engine
    pub fn new<F1, F2, F3>(
        name: &'static str,
        speak_fn: F1,
        list_voices_fn: F2,
        is_available_fn: F3,
    ) -> Self
    where
        F1: Fn(&str, &VoiceConfig) -> Result<(), SpeechError> + Send + Sync + 'static,
        F2: Fn() -> Result<Vec<String>, SpeechError> + Send + Sync + 'static,
        F3: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            speak_fn: Arc::new(speak_fn),
            list_voices_fn: Arc::new(list_voices_fn),
            is_available_fn: Arc::new(is_available_fn),
        }
    }

    /// Engine with only a speak function, always available and voiceless
    pub fn from_fn<F>(name: &'static str, speak_fn: F) -> Self
    where
        F: Fn(&str, &VoiceConfig) -> Result<(), SpeechError> + Send + Sync + 'static,
    {
        Self::new(name, speak_fn, || Ok(vec![]), || true)
    }
}

#[async_trait]
impl TtsEngine for CustomTtsEngine {
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<(), SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::Engine("Text cannot be empty".to_string()));
        }

        if text.len() > MAX_TEXT_LENGTH {
            return Err(SpeechError::Engine(format!(
                "Text too long (max {} bytes)",
                MAX_TEXT_LENGTH
            )));
        }

        let speak_fn = self.speak_fn.clone();
        let text = text.to_string();
        let voice = voice.clone();
        tokio::task::spawn_blocking(move || speak_fn(&text, &voice))
            .await
            .map_err(|e| SpeechError::Engine(format!("Custom engine panicked: {}", e)))?
    }

    async fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        (self.list_voices_fn)()
    }

    fn is_available(&self) -> bool {
        (self.is_available_fn)()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
