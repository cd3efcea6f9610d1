//! FIFO queue of utterances between the capture loop and the voice worker

use crate::error::SpeechError;
use tokio::sync::mpsc;

/// Create a connected queue and receiver
///
/// The queue is unbounded so enqueueing never blocks the capture loop.
pub fn voice_queue() -> (VoiceQueue, VoiceQueueReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (VoiceQueue { sender }, VoiceQueueReceiver { receiver })
}

/// Producer side; cheap to clone
#[derive(Debug, Clone)]
pub struct VoiceQueue {
    sender: mpsc::UnboundedSender<String>,
}

impl VoiceQueue {
    /// Append an utterance; fails only once the worker has gone away
    pub fn enqueue(&self, text: impl Into<String>) -> Result<(), SpeechError> {
        self.sender
            .send(text.into())
            .map_err(|_| SpeechError::Queue("Voice worker is no longer running".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer side, owned by the worker
#[derive(Debug)]
pub struct VoiceQueueReceiver {
    receiver: mpsc::UnboundedReceiver<String>,
}

impl VoiceQueueReceiver {
    /// Next utterance, or `None` once every producer is dropped and the queue is empty
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Next utterance if one is already waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Remove and return everything currently queued
    pub fn drain(&mut self) -> Vec<String> {
        let mut pending = Vec::new();
        while let Some(text) = self.try_recv() {
            pending.push(text);
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut receiver) = voice_queue();
        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();
        queue.clone().enqueue("c").unwrap();

        assert_eq!(receiver.recv().await.as_deref(), Some("a"));
        assert_eq!(receiver.drain(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(receiver.try_recv(), None);
    }

    #[tokio::test]
    async fn test_closed_when_senders_dropped() {
        let (queue, mut receiver) = voice_queue();
        queue.enqueue("last").unwrap();
        drop(queue);
        assert_eq!(receiver.recv().await.as_deref(), Some("last"));
        assert_eq!(receiver.recv().await, None);
    }

    #[test]
    fn test_enqueue_after_receiver_dropped() {
        let (queue, receiver) = voice_queue();
        drop(receiver);
        assert!(queue.is_closed());
        assert!(matches!(queue.enqueue("x"), Err(SpeechError::Queue(_))));
    }
}
