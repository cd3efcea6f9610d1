//! lookout-spk: spoken output for the lookout assistant
//!
//! Provides text-to-speech with:
//! - Native TTS engines driven through the platform front end
//! - A user-supplied command engine and a closure-backed custom engine
//! - A FIFO voice queue drained by a single background worker

pub mod error;
pub mod config;
pub mod engines;
pub mod queue;
pub mod worker;

pub use error::SpeechError;
pub use config::{CommandEngineConfig, SpeechConfig, TtsEngineKind, VoiceConfig};
pub use engines::{create_engine, TtsEngine};
pub use queue::{voice_queue, VoiceQueue, VoiceQueueReceiver};
pub use worker::{VoiceWorker, WorkerHandle, WorkerReport, WorkerState};
