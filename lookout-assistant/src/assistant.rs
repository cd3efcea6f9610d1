//! Owned assistant context and the main loop

use chrono::Local;
use lookout_core::pipeline::HELP_TEXT;
use lookout_core::{
    AlertGate, AlertRule, AssistantConfig, Clock, Detection, DetectionMemory, Error, FrameDisplay,
    FrameSource, KeyCommand, ObjectDetector, Overlay, Shutdown,
};
use lookout_spk::VoiceQueue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a single frame's detections caused
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Labels announced this frame, in detection order
    pub announced: Vec<String>,
    /// A trigger object is in frame
    pub alert_visible: bool,
    /// The alert message was queued this frame
    pub alert_fired: bool,
}

/// Totals for one run of the loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub detection_errors: u64,
    pub render_errors: u64,
    pub announcements: u64,
    pub alerts: u64,
}

/// Assistant state shared by every frame of a run
pub struct Assistant {
    config: AssistantConfig,
    memory: DetectionMemory,
    gate: AlertGate,
    rule: Option<AlertRule>,
    voice: VoiceQueue,
    clock: Arc<dyn Clock>,
    shutdown: Shutdown,
}

impl Assistant {
    pub fn new(
        config: AssistantConfig,
        voice: VoiceQueue,
        clock: Arc<dyn Clock>,
        shutdown: Shutdown,
    ) -> Result<Self, Error> {
        config
            .validate()
            .map_err(|e| Error::Configuration(format!("Invalid assistant configuration: {}", e)))?;

        let rule = config.alert.enabled.then(|| AlertRule::from_config(&config.alert));
        Ok(Self {
            memory: DetectionMemory::new(config.memory_window()),
            gate: AlertGate::new(config.alert.cooldown()),
            rule,
            config,
            voice,
            clock,
            shutdown,
        })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn memory(&self) -> &DetectionMemory {
        &self.memory
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    fn say(&self, text: String) {
        if let Err(e) = self.voice.enqueue(text) {
            debug!("Dropped utterance: {}", e);
        }
    }

    /// Decide announcements and the alert for one frame's detections
    pub fn observe(&self, detections: &[Detection], now: Instant) -> FrameReport {
        let mut report = FrameReport::default();

        for detection in detections {
            let label = detection.label.as_str();

            if self.memory.should_announce(label, now) {
                info!("New object: {} ({:.2})", label, detection.confidence);
                self.say(self.config.announcement(label));
                report.announced.push(label.to_string());
            }

            if let Some(ref rule) = self.rule {
                if rule.matches(label) {
                    report.alert_visible = true;
                    if self.gate.should_alert(now) {
                        info!("Alert triggered by {}", label);
                        self.say(rule.message().to_string());
                        report.alert_fired = true;
                    }
                }
            }
        }

        report
    }

    /// Spoken summary of what is currently remembered
    pub fn status_utterance(&self) -> String {
        let labels = self.memory.labels();
        let mut status = format!("Currently tracking {} objects in memory", labels.len());
        if !labels.is_empty() {
            status.push_str(": ");
            status.push_str(&labels.join(", "));
        }
        status
    }

    pub fn speak_status(&self) {
        let status = self.status_utterance();
        info!("{}", status);
        self.say(status);
    }

    /// Overlay state for a frame
    pub fn overlay(&self, report: &FrameReport) -> Overlay {
        let alert_banner = match (&self.rule, report.alert_visible) {
            (Some(rule), true) => Some(rule.banner().to_string()),
            _ => None,
        };

        Overlay {
            memory_count: self.memory.len(),
            alert_banner,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            help: HELP_TEXT,
        }
    }

    /// Run until the stream ends, a quit key is pressed or shutdown is triggered
    ///
    /// Shutdown is always triggered on return.
    pub fn run<S, D, V>(&self, source: &mut S, detector: &D, display: &mut V) -> RunSummary
    where
        S: FrameSource,
        D: ObjectDetector<S::Frame>,
        V: FrameDisplay<S::Frame>,
    {
        let mut summary = RunSummary::default();
        info!("Assistant loop started");

        while !self.shutdown.is_triggered() {
            let mut frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source ended");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read frame from camera: {}", e);
                    break;
                }
            };
            summary.frames += 1;

            let detections = detector.detect(&frame).unwrap_or_else(|e| {
                warn!("Detection failed: {}", e);
                summary.detection_errors += 1;
                Vec::new()
            });

            let now = self.clock.now();
            let report = self.observe(&detections, now);
            summary.announcements += report.announced.len() as u64;
            if report.alert_fired {
                summary.alerts += 1;
            }

            let overlay = self.overlay(&report);
            match display.show(&mut frame, &detections, &overlay) {
                Ok(Some(KeyCommand::Quit)) => {
                    info!("Quit requested");
                    self.shutdown.trigger();
                }
                Ok(Some(KeyCommand::SpeakStatus)) => self.speak_status(),
                Ok(None) => {}
                Err(e) => {
                    warn!("Render failed: {}", e);
                    summary.render_errors += 1;
                }
            }

            if self.config.evict_expired_memory {
                self.memory.evict_expired(now);
            }

            let pause = self.config.frame_pause();
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
        }

        self.shutdown.trigger();
        info!(
            "Assistant loop stopped after {} frames ({} announcements, {} alerts)",
            summary.frames, summary.announcements, summary.alerts
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::{BoundingBox, ManualClock};
    use lookout_spk::{voice_queue, VoiceQueueReceiver};
    use std::time::Duration;

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(10.0, 10.0, 50.0, 50.0))
    }

    fn assistant_with(config: AssistantConfig) -> (Assistant, VoiceQueueReceiver) {
        let (queue, receiver) = voice_queue();
        let assistant = Assistant::new(config, queue, Arc::new(ManualClock::new()), Shutdown::new()).unwrap();
        (assistant, receiver)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let (queue, _receiver) = voice_queue();
        let config = AssistantConfig {
            memory_window_secs: 0,
            ..AssistantConfig::default()
        };
        let result = Assistant::new(config, queue, Arc::new(ManualClock::new()), Shutdown::new());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_observe_announces_once_per_window() {
        let (assistant, mut receiver) = assistant_with(AssistantConfig::default());
        let t0 = Instant::now();

        let report = assistant.observe(&[detection("cup", 0.9), detection("cup", 0.7)], t0);
        assert_eq!(report.announced, vec!["cup".to_string()]);

        let report = assistant.observe(&[detection("cup", 0.9)], t0 + Duration::from_secs(3));
        assert!(report.announced.is_empty());

        assert_eq!(receiver.drain(), vec!["I see a cup".to_string()]);
    }

    #[test]
    fn test_alert_banner_ungated_voice_gated() {
        let (assistant, mut receiver) = assistant_with(AssistantConfig::default());
        let t0 = Instant::now();

        let first = assistant.observe(&[detection("cell phone", 0.7)], t0);
        assert!(first.alert_visible && first.alert_fired);

        let second = assistant.observe(&[detection("cell phone", 0.7)], t0 + Duration::from_secs(1));
        assert!(second.alert_visible);
        assert!(!second.alert_fired);
        assert_eq!(
            assistant.overlay(&second).alert_banner.as_deref(),
            Some("CHARGER DETECTED!")
        );

        assert_eq!(
            receiver.drain(),
            vec![
                "I see a cell phone".to_string(),
                "Charger detected! Please connect your device.".to_string(),
            ]
        );
    }

    #[test]
    fn test_disabled_alert() {
        let mut config = AssistantConfig::default();
        config.alert.enabled = false;
        let (assistant, _receiver) = assistant_with(config);

        let report = assistant.observe(&[detection("phone charger", 0.9)], Instant::now());
        assert!(!report.alert_visible);
        assert!(assistant.overlay(&report).alert_banner.is_none());
    }

    #[test]
    fn test_status_utterance() {
        let (assistant, mut receiver) = assistant_with(AssistantConfig::default());
        assert_eq!(assistant.status_utterance(), "Currently tracking 0 objects in memory");

        assistant.observe(&[detection("person", 0.9), detection("cup", 0.5)], Instant::now());
        assert_eq!(
            assistant.status_utterance(),
            "Currently tracking 2 objects in memory: cup, person"
        );

        receiver.drain();
        assistant.speak_status();
        assert_eq!(receiver.drain().len(), 1);
    }

    #[test]
    fn test_overlay_fields() {
        let (assistant, _receiver) = assistant_with(AssistantConfig::default());
        assistant.observe(&[detection("person", 0.9)], Instant::now());

        let overlay = assistant.overlay(&FrameReport::default());
        assert_eq!(overlay.memory_count, 1);
        assert_eq!(overlay.help, HELP_TEXT);
        assert_eq!(overlay.timestamp.len(), 8);
        assert!(overlay.alert_banner.is_none());
    }

    #[test]
    fn test_enqueue_after_worker_gone_is_ignored() {
        let (assistant, receiver) = assistant_with(AssistantConfig::default());
        drop(receiver);
        let report = assistant.observe(&[detection("cup", 0.9)], Instant::now());
        assert_eq!(report.announced, vec!["cup".to_string()]);
    }
}
