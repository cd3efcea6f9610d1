//! Time-windowed announcement memory
//!
//! Remembers when each label was last announced so the same object is not
//! spoken again until the suppression window has elapsed.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-label record of the last announcement
pub struct DetectionMemory {
    window: Duration,
    entries: RwLock<HashMap<String, Instant>>,
}

impl DetectionMemory {
    /// Create an empty memory with the given suppression window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `label` should be announced at `now`
    ///
    /// Returns true and records `now` when the label is unknown or its window
    /// has elapsed; returns false without touching the memory otherwise. The
    /// check and the update happen under one write lock, so two callers racing
    /// on the same label cannot both win.
    pub fn should_announce(&self, label: &str, now: Instant) -> bool {
        let mut entries = self.entries.write();

        if let Some(last) = entries.get(label) {
            // A timestamp from the future (clock skew between callers) counts as zero elapsed
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.window {
                return false;
            }
        }

        entries.insert(label.to_string(), now);
        debug!("Announcing {} ({} labels in memory)", label, entries.len());
        true
    }

    /// When `label` was last announced, if ever
    pub fn last_announced(&self, label: &str) -> Option<Instant> {
        self.entries.read().get(label).copied()
    }

    /// Number of remembered labels
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remembered labels in sorted order
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.entries.read().keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Drop entries whose window has elapsed at `now`, returning how many were removed
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, last| now.saturating_duration_since(*last) < self.window);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Evicted {} expired labels from memory", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn test_first_sighting_is_announced() {
        let memory = DetectionMemory::new(WINDOW);
        let now = Instant::now();
        assert!(memory.should_announce("person", now));
        assert_eq!(memory.last_announced("person"), Some(now));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_repeat_within_window_is_suppressed() {
        let memory = DetectionMemory::new(WINDOW);
        let t0 = Instant::now();
        assert!(memory.should_announce("person", t0));
        assert!(!memory.should_announce("person", t0 + Duration::from_secs(9)));
        // Suppression does not refresh the timestamp
        assert_eq!(memory.last_announced("person"), Some(t0));
    }

    #[test]
    fn test_repeat_at_window_boundary_is_announced() {
        let memory = DetectionMemory::new(WINDOW);
        let t0 = Instant::now();
        assert!(memory.should_announce("person", t0));
        assert!(memory.should_announce("person", t0 + WINDOW));
        assert_eq!(memory.last_announced("person"), Some(t0 + WINDOW));
    }

    #[test]
    fn test_labels_are_independent() {
        let memory = DetectionMemory::new(WINDOW);
        let t0 = Instant::now();
        assert!(memory.should_announce("person", t0));
        assert!(memory.should_announce("cup", t0));
        assert!(!memory.should_announce("person", t0 + Duration::from_secs(1)));
        assert_eq!(memory.labels(), vec!["cup".to_string(), "person".to_string()]);
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let memory = DetectionMemory::new(WINDOW);
        let t0 = Instant::now();
        assert!(memory.should_announce("Cup", t0));
        assert!(memory.should_announce("cup", t0));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_earlier_timestamp_is_suppressed() {
        let memory = DetectionMemory::new(WINDOW);
        let t0 = Instant::now() + Duration::from_secs(60);
        assert!(memory.should_announce("person", t0));
        assert!(!memory.should_announce("person", t0 - Duration::from_secs(30)));
    }

    #[test]
    fn test_evict_expired() {
        let memory = DetectionMemory::new(WINDOW);
        let t0 = Instant::now();
        memory.should_announce("person", t0);
        memory.should_announce("cup", t0 + Duration::from_secs(5));

        assert_eq!(memory.evict_expired(t0 + Duration::from_secs(12)), 1);
        assert_eq!(memory.labels(), vec!["cup".to_string()]);
        assert_eq!(memory.evict_expired(t0 + Duration::from_secs(12)), 0);
    }

    #[test]
    fn test_clear() {
        let memory = DetectionMemory::new(WINDOW);
        memory.should_announce("person", Instant::now());
        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_concurrent_same_label_single_winner() {
        let memory = Arc::new(DetectionMemory::new(WINDOW));
        let now = Instant::now();
        let mut handles = vec![];

        for _ in 0..16 {
            let memory = memory.clone();
            handles.push(thread::spawn(move || memory.should_announce("person", now)));
        }

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
