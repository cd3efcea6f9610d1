//! Configuration for lookout-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Official YOLOv8n ONNX export
pub const DEFAULT_MODEL_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx";

/// Vision system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// USB camera device index (0, 1, 2, etc.)
    pub camera_id: u32,
    /// Requested frame rate (frames per second)
    pub frame_rate: u32,
    /// Requested camera resolution (width, height)
    pub resolution: (u32, u32),
    /// Directory holding downloaded models
    pub model_path: PathBuf,
    /// Model file name inside `model_path`
    pub model_file: String,
    /// Where to download the model from when it is missing
    pub model_url: String,
    /// Expected SHA-256 of the model download, hex encoded
    pub model_sha256: Option<String>,
    /// Square model input size in pixels
    pub input_size: u32,
    /// Minimum class score kept after decoding
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes of one class are suppressed
    pub nms_threshold: f32,
    /// Title of the preview window
    pub window_title: String,
    /// Show the preview window; when false the loop runs headless
    pub show_window: bool,
}

impl Default for VisionConfig {
    fn default() -> Self {
        let model_path = dirs::home_dir()
            .map(|mut p| {
                p.push(".lookout");
                p.push("models");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models"));

        Self {
            camera_id: 0,
            frame_rate: 30,
            resolution: (640, 480),
            model_path,
            model_file: "yolov8n.onnx".to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_sha256: None,
            input_size: 640,
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            window_title: "Lookout".to_string(),
            show_window: true,
        }
    }
}

impl VisionConfig {
    /// Full path of the model file
    pub fn model_file_path(&self) -> PathBuf {
        self.model_path.join(&self.model_file)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == 0 || self.frame_rate > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("Resolution must be non-zero".to_string());
        }

        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if self.camera_id > 100 {
            return Err("Camera ID too large (max 100)".to_string());
        }

        if self.model_file.is_empty()
            || self.model_file.contains("..")
            || self.model_file.contains('/')
            || self.model_file.contains('\\')
        {
            return Err("Model file must be a plain file name".to_string());
        }

        if !self.model_url.starts_with("https://") {
            return Err("Model URL must use HTTPS".to_string());
        }

        if let Some(ref checksum) = self.model_sha256 {
            if checksum.len() != 64 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("Model checksum must be 64 hex characters".to_string());
            }
        }

        if self.input_size < 32 || self.input_size > 2048 || self.input_size % 32 != 0 {
            return Err("Input size must be a multiple of 32 between 32 and 2048".to_string());
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err("NMS threshold must be between 0.0 and 1.0".to_string());
        }

        if self.window_title.trim().is_empty() {
            return Err("Window title cannot be empty".to_string());
        }

        Ok(())
    }
}
