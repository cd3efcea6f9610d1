//! Object detection pipeline

use crate::error::VisionError;
use crate::models::YoloModel;
use lookout_core::{Detection, ObjectDetector};
use opencv::prelude::Mat;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Object detection pipeline
pub struct DetectionPipeline {
    yolo: Arc<YoloModel>,
    frames: AtomicU64,
}

impl DetectionPipeline {
    /// Create a new detection pipeline
    pub fn new(yolo: Arc<YoloModel>) -> Self {
        Self {
            yolo,
            frames: AtomicU64::new(0),
        }
    }

    /// Process frame and detect objects
    pub fn detect(&self, frame: &Mat) -> Result<Vec<Detection>, VisionError> {
        let started = Instant::now();
        let detections = self.yolo.detect(frame)?;
        let frame_no = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Frame {}: {} objects in {:?}",
            frame_no,
            detections.len(),
            started.elapsed()
        );
        Ok(detections)
    }

    /// Frames successfully processed so far
    pub fn frames_processed(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl ObjectDetector<Mat> for DetectionPipeline {
    fn detect(&self, frame: &Mat) -> lookout_core::Result<Vec<Detection>> {
        Ok(DetectionPipeline::detect(self, frame)?)
    }
}
