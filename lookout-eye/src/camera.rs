//! USB webcam capture

use crate::config::VisionConfig;
use crate::error::VisionError;
use lookout_core::FrameSource;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Camera manager for USB webcam capture
pub struct CameraManager {
    config: Arc<VisionConfig>,
    capture: Option<VideoCapture>,
    frames_read: u64,
}

impl CameraManager {
    /// Create a new camera manager; the device is not opened until `initialize`
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self {
            config,
            capture: None,
            frames_read: 0,
        }
    }

    /// Open the device and request the configured resolution and frame rate
    pub fn initialize(&mut self) -> Result<(), VisionError> {
        if self.capture.is_some() {
            return Ok(());
        }

        let camera_id = self.config.camera_id;
        let mut capture = VideoCapture::new(camera_id as i32, CAP_ANY)
            .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", camera_id, e)))?;

        let opened = capture
            .is_opened()
            .map_err(|e| VisionError::Camera(format!("Camera {} not opened: {}", camera_id, e)))?;
        if !opened {
            return Err(VisionError::Camera(format!("Camera {} failed to open", camera_id)));
        }

        let (width, height) = self.config.resolution;
        // Drivers may ignore these; the frames report their real size
        for (prop, value, name) in [
            (CAP_PROP_FRAME_WIDTH, width as f64, "width"),
            (CAP_PROP_FRAME_HEIGHT, height as f64, "height"),
            (CAP_PROP_FPS, self.config.frame_rate as f64, "FPS"),
        ] {
            match capture.set(prop, value) {
                Ok(true) => {}
                Ok(false) => warn!("Camera {} ignored requested {}", camera_id, name),
                Err(e) => warn!("Failed to set camera {}: {}", name, e),
            }
        }

        self.capture = Some(capture);
        info!(
            "Camera {} initialized at {}x{} @ {}fps",
            camera_id, width, height, self.config.frame_rate
        );
        Ok(())
    }

    /// Capture a single frame; an empty frame means the stream has ended
    pub fn capture_frame(&mut self) -> Result<Option<Mat>, VisionError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| VisionError::Camera("Camera not initialized".to_string()))?;

        let mut frame = Mat::default();
        let grabbed = capture
            .read(&mut frame)
            .map_err(|e| VisionError::Camera(format!("Failed to read frame: {}", e)))?;

        if !grabbed || frame.rows() <= 0 || frame.cols() <= 0 {
            debug!("Camera returned no frame after {} frames", self.frames_read);
            return Ok(None);
        }

        self.frames_read += 1;
        Ok(Some(frame))
    }

    /// Grab one frame and report its (width, height)
    pub fn probe(&mut self) -> Result<Option<(i32, i32)>, VisionError> {
        Ok(self.capture_frame()?.map(|frame| (frame.cols(), frame.rows())))
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn is_open(&self) -> bool {
        self.capture.is_some()
    }

    /// Release the device
    pub fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release camera: {}", e);
            }
            info!("Camera stopped after {} frames", self.frames_read);
        }
    }
}

impl FrameSource for CameraManager {
    type Frame = Mat;

    fn next_frame(&mut self) -> lookout_core::Result<Option<Mat>> {
        Ok(self.capture_frame()?)
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop();
    }
}
