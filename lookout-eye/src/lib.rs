//! lookout-eye: camera, detector and on-screen rendering for Lookout
//!
//! Wraps OpenCV capture and drawing and a YOLOv8 ONNX model behind the
//! pipeline traits from `lookout-core`, so the assistant loop never touches
//! OpenCV or ONNX Runtime directly.

pub mod camera;
pub mod config;
pub mod models;
pub mod processing;
pub mod render;
pub mod error;
mod utils;

pub use camera::CameraManager;
pub use config::VisionConfig;
pub use error::VisionError;
pub use models::{ModelManager, YoloModel};
pub use processing::DetectionPipeline;
pub use render::OverlayRenderer;
