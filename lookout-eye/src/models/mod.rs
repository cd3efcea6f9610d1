//! Vision model management and inference

pub mod manager;
pub mod yolo;

pub use manager::ModelManager;
pub use yolo::{decode_yolov8, non_max_suppression, DecodeParams, YoloModel, COCO_CLASSES};
