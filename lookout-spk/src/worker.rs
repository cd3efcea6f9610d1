//! Background voice worker
//!
//! A single consumer drains the voice queue and speaks one utterance at a
//! time. It waits on the queue with a timeout so it notices shutdown even
//! when nothing is being said, and it never interrupts an utterance that has
//! already started.

use crate::config::{SpeechConfig, VoiceConfig};
use crate::engines::TtsEngine;
use crate::queue::VoiceQueueReceiver;
use lookout_core::Shutdown;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Speaking,
    Stopped,
}

/// Cloneable view of a running worker
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    state: Arc<RwLock<WorkerState>>,
    spoken: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl WorkerHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(WorkerState::Idle)),
            spoken: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Utterances that finished successfully
    pub fn spoken(&self) -> u64 {
        self.spoken.load(Ordering::Acquire)
    }

    /// Utterances the engine failed to speak
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
    }
}

/// What the worker did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    pub spoken: u64,
    pub failed: u64,
    /// Utterances still queued when the worker stopped
    pub discarded: usize,
}

pub struct VoiceWorker {
    engine: Arc<dyn TtsEngine>,
    voice: VoiceConfig,
    receiver: VoiceQueueReceiver,
    shutdown: Shutdown,
    poll_interval: Duration,
    handle: WorkerHandle,
}

impl VoiceWorker {
    pub fn new(
        engine: Arc<dyn TtsEngine>,
        voice: VoiceConfig,
        receiver: VoiceQueueReceiver,
        shutdown: Shutdown,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            voice,
            receiver,
            shutdown,
            poll_interval,
            handle: WorkerHandle::new(),
        }
    }

    pub fn from_config(
        engine: Arc<dyn TtsEngine>,
        config: &SpeechConfig,
        receiver: VoiceQueueReceiver,
        shutdown: Shutdown,
    ) -> Self {
        Self::new(engine, config.voice.clone(), receiver, shutdown, config.poll_interval())
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Drain the queue until shutdown is signalled or every sender is gone
    pub async fn run(mut self) -> WorkerReport {
        info!("Voice worker started ({} engine)", self.engine.name());

        loop {
            if self.shutdown.is_triggered() {
                debug!("Voice worker saw shutdown");
                break;
            }

            match tokio::time::timeout(self.poll_interval, self.receiver.recv()).await {
                Ok(Some(text)) => self.speak(&text).await,
                Ok(None) => {
                    debug!("Voice queue closed");
                    break;
                }
                // Nothing queued; loop around to recheck shutdown
                Err(_) => continue,
            }
        }

        let discarded = self.receiver.drain().len();
        if discarded > 0 {
            debug!("Discarding {} pending utterances", discarded);
        }

        self.handle.set_state(WorkerState::Stopped);
        let report = WorkerReport {
            spoken: self.handle.spoken(),
            failed: self.handle.failed(),
            discarded,
        };
        info!(
            "Voice worker stopped ({} spoken, {} failed)",
            report.spoken, report.failed
        );
        report
    }

    async fn speak(&self, text: &str) {
        self.handle.set_state(WorkerState::Speaking);

        match self.engine.speak(text, &self.voice).await {
            Ok(()) => {
                self.handle.spoken.fetch_add(1, Ordering::AcqRel);
                debug!("Spoke {:?}", text);
            }
            Err(e) => {
                self.handle.failed.fetch_add(1, Ordering::AcqRel);
                warn!("Failed to speak {:?}: {}", text, e);
            }
        }

        self.handle.set_state(WorkerState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{CustomTtsEngine, MockTtsEngine};
    use crate::error::SpeechError;
    use crate::queue::voice_queue;
    use mockall::Sequence;
    use std::sync::atomic::AtomicBool;

    const POLL: Duration = Duration::from_millis(20);

    fn worker(engine: Arc<dyn TtsEngine>, receiver: VoiceQueueReceiver, shutdown: Shutdown) -> VoiceWorker {
        VoiceWorker::new(engine, VoiceConfig::default(), receiver, shutdown, POLL)
    }

    #[tokio::test]
    async fn test_speaks_in_fifo_order() {
        let mut mock = MockTtsEngine::new();
        let mut seq = Sequence::new();
        mock.expect_name().return_const("mock");
        for word in ["a", "b", "c"] {
            mock.expect_speak()
                .withf(move |text, _| text.to_string() == word)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }

        let (queue, receiver) = voice_queue();
        for word in ["a", "b", "c"] {
            queue.enqueue(word).unwrap();
        }
        drop(queue);

        let report = worker(Arc::new(mock), receiver, Shutdown::new()).run().await;
        assert_eq!(report.spoken, 3);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_utterances_never_overlap() {
        let speaking = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicU64::new(0));
        let heard = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let engine = {
            let speaking = speaking.clone();
            let overlaps = overlaps.clone();
            let heard = heard.clone();
            CustomTtsEngine::from_fn("recorder", move |text, _| {
                if speaking.swap(true, Ordering::SeqCst) {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                std::thread::sleep(Duration::from_millis(15));
                heard.lock().push(text.to_string());
                speaking.store(false, Ordering::SeqCst);
                Ok(())
            })
        };

        let (queue, receiver) = voice_queue();
        let task = tokio::spawn(worker(Arc::new(engine), receiver, Shutdown::new()).run());
        for word in ["a", "b", "c"] {
            queue.enqueue(word).unwrap();
        }
        drop(queue);

        let report = task.await.unwrap();
        assert_eq!(report.spoken, 3);
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(*heard.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failed_utterance_is_dropped() {
        let engine = CustomTtsEngine::from_fn("flaky", |text, _| {
            if text == "bad" {
                Err(SpeechError::Engine("device busy".to_string()))
            } else {
                Ok(())
            }
        });

        let (queue, receiver) = voice_queue();
        queue.enqueue("bad").unwrap();
        queue.enqueue("good").unwrap();
        drop(queue);

        let w = worker(Arc::new(engine), receiver, Shutdown::new());
        let handle = w.handle();
        let report = w.run().await;

        assert_eq!(report.spoken, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(handle.failed(), 1);
        assert_eq!(handle.state(), WorkerState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_state_transitions() {
        let release = Arc::new(AtomicBool::new(false));
        let engine = {
            let release = release.clone();
            CustomTtsEngine::from_fn("gated", move |_, _| {
                while !release.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(())
            })
        };

        let (queue, receiver) = voice_queue();
        let w = worker(Arc::new(engine), receiver, Shutdown::new());
        let handle = w.handle();
        assert_eq!(handle.state(), WorkerState::Idle);

        let task = tokio::spawn(w.run());
        queue.enqueue("hello").unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while handle.state() != WorkerState::Speaking {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        release.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(5), async {
            while handle.spoken() < 1 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        drop(queue);
        task.await.unwrap();
        assert_eq!(handle.state(), WorkerState::Stopped);
        assert_eq!(handle.spoken(), 1);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_while_idle() {
        let (queue, receiver) = voice_queue();
        let shutdown = Shutdown::new();
        let w = worker(Arc::new(CustomTtsEngine::from_fn("noop", |_, _| Ok(()))), receiver, shutdown.clone());
        let handle = w.handle();
        let task = tokio::spawn(w.run());

        shutdown.trigger();
        let report = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.spoken, 0);
        assert_eq!(handle.state(), WorkerState::Stopped);
        // The receiver went away with the worker
        assert!(matches!(queue.enqueue("late"), Err(SpeechError::Queue(_))));
    }

    #[tokio::test]
    async fn test_pending_discarded_after_shutdown() {
        let (queue, receiver) = voice_queue();
        let shutdown = Shutdown::new();
        queue.enqueue("one").unwrap();
        queue.enqueue("two").unwrap();
        shutdown.trigger();

        let report = worker(Arc::new(CustomTtsEngine::from_fn("noop", |_, _| Ok(()))), receiver, shutdown)
            .run()
            .await;
        assert_eq!(report.spoken, 0);
        assert_eq!(report.discarded, 2);
    }
}
