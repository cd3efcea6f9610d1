// End-to-end: scripted frames through the assistant loop into a recording voice worker

use lookout_assistant::{Assistant, RunSummary};
use lookout_core::{
    AssistantConfig, BoundingBox, Detection, FrameDisplay, FrameSource, KeyCommand, ManualClock, ObjectDetector,
    Overlay, Result, Shutdown,
};
use lookout_spk::engines::CustomTtsEngine;
use lookout_spk::{voice_queue, SpeechConfig, VoiceWorker, WorkerReport, WorkerState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

struct Script {
    frames: VecDeque<Vec<Detection>>,
    clock: Arc<ManualClock>,
    step: Duration,
    first: bool,
}

impl FrameSource for Script {
    type Frame = Vec<Detection>;

    fn next_frame(&mut self) -> Result<Option<Vec<Detection>>> {
        if !self.first {
            self.clock.advance(self.step);
        }
        self.first = false;
        Ok(self.frames.pop_front())
    }
}

struct Echo;

impl ObjectDetector<Vec<Detection>> for Echo {
    fn detect(&self, frame: &Vec<Detection>) -> Result<Vec<Detection>> {
        Ok(frame.clone())
    }
}

struct Keys(VecDeque<Option<KeyCommand>>);

impl FrameDisplay<Vec<Detection>> for Keys {
    fn show(&mut self, _: &mut Vec<Detection>, _: &[Detection], _: &Overlay) -> Result<Option<KeyCommand>> {
        Ok(self.0.pop_front().flatten())
    }
}

fn object(label: &str, confidence: f32) -> Detection {
    Detection::new(label, confidence, BoundingBox::new(5.0, 5.0, 60.0, 90.0))
}

/// Run the frames through a real worker and return what was spoken
async fn speak_script(
    frames: Vec<Vec<Detection>>,
    keys: Vec<Option<KeyCommand>>,
    step: Duration,
    config: AssistantConfig,
) -> (RunSummary, WorkerReport, Vec<String>) {
    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = heard.clone();
    let engine = Arc::new(CustomTtsEngine::from_fn("recorder", move |text, _| {
        sink.lock().push(text.to_string());
        Ok(())
    }));

    let (queue, receiver) = voice_queue();
    let speech = SpeechConfig {
        poll_interval_ms: 20,
        ..SpeechConfig::default()
    };
    // The worker stops once the assistant drops its queue, after draining it
    let worker = VoiceWorker::from_config(engine, &speech, receiver, Shutdown::new());
    let handle = worker.handle();
    let task = tokio::spawn(worker.run());

    let clock = Arc::new(ManualClock::new());
    let mut source = Script {
        frames: frames.into(),
        clock: clock.clone(),
        step,
        first: true,
    };
    let mut display = Keys(keys.into());

    let assistant = Assistant::new(config, queue, clock, Shutdown::new()).unwrap();
    let summary = assistant.run(&mut source, &Echo, &mut display);
    drop(assistant);

    let report = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("worker did not stop")
        .unwrap();
    assert_eq!(handle.state(), WorkerState::Stopped);

    let heard = heard.lock().clone();
    (summary, report, heard)
}

fn fast() -> AssistantConfig {
    AssistantConfig {
        frame_pause_ms: 0,
        ..AssistantConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeated_object_spoken_twice_in_twelve_seconds() {
    let frames = vec![vec![object("bottle", 0.9)]; 7];
    let (summary, report, heard) = speak_script(frames, vec![], Duration::from_secs(2), fast()).await;

    assert_eq!(summary.frames, 7);
    assert_eq!(summary.announcements, 2);
    assert_eq!(report.spoken, 2);
    assert_eq!(heard, vec!["I see a bottle", "I see a bottle"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_announcements_spoken_in_detection_order() {
    let frames = vec![
        vec![object("person", 0.95), object("cup", 0.7)],
        vec![object("cup", 0.7), object("laptop", 0.5)],
    ];
    let (_, _, heard) = speak_script(frames, vec![], Duration::from_secs(1), fast()).await;

    assert_eq!(heard, vec!["I see a person", "I see a cup", "I see a laptop"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_charger_alert_cooldown() {
    // Phone in every frame, one frame per second for 7 seconds
    let frames = vec![vec![object("cell phone", 0.8)]; 7];
    let (summary, _, heard) = speak_script(frames, vec![], Duration::from_secs(1), fast()).await;

    let alert = "Charger detected! Please connect your device.";
    // Fires at t = 0 and t = 5
    assert_eq!(summary.alerts, 2);
    assert_eq!(heard.iter().filter(|s| s.as_str() == alert).count(), 2);
    assert_eq!(heard[0], "I see a cell phone");
    assert_eq!(heard[1], alert);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_then_quit() {
    let frames = vec![
        vec![object("dog", 0.9)],
        vec![object("cat", 0.65)],
        vec![],
        vec![object("bird", 0.9)],
    ];
    let keys = vec![None, Some(KeyCommand::SpeakStatus), Some(KeyCommand::Quit)];
    let (summary, _, heard) = speak_script(frames, keys, Duration::from_secs(1), fast()).await;

    assert_eq!(summary.frames, 3);
    assert_eq!(
        heard,
        vec![
            "I see a dog",
            "I see a cat",
            "Currently tracking 2 objects in memory: cat, dog",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_custom_template() {
    let config = AssistantConfig {
        announce_template: "There is a {label} in front of you".to_string(),
        ..fast()
    };
    let frames = vec![vec![object("chair", 0.9)]];
    let (_, _, heard) = speak_script(frames, vec![], Duration::from_secs(1), config).await;

    assert_eq!(heard, vec!["There is a chair in front of you"]);
}
