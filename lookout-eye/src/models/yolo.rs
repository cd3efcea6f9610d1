//! YOLOv8 object detection model

use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::utils::mat_to_chw_tensor;
use lookout_core::{BoundingBox, Detection};
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Box coordinates per candidate (cx, cy, w, h)
const BOX_FEATURES: usize = 4;

/// How model-space boxes map back onto the frame
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub frame_width: f32,
    pub frame_height: f32,
}

/// Work out (features, candidates, transposed) from an output shape
///
/// The standard export is `[1, 4 + classes, N]`; some exports emit `[1, N, 4 + classes]`.
pub fn output_layout(shape: &[i64], num_classes: usize) -> Result<(usize, usize, bool), VisionError> {
    if shape.len() != 3 || shape[0] != 1 || shape.iter().any(|d| *d <= 0) {
        return Err(VisionError::Ort(format!("Unexpected YOLO output shape {:?}", shape)));
    }

    let features = BOX_FEATURES + num_classes;
    let (a, b) = (shape[1] as usize, shape[2] as usize);
    if a == features {
        Ok((a, b, false))
    } else if b == features {
        Ok((b, a, true))
    } else {
        Err(VisionError::Ort(format!(
            "YOLO output shape {:?} does not match {} classes",
            shape, num_classes
        )))
    }
}

/// Decode raw YOLOv8 output into frame-space detections
///
/// Picks the best class per candidate and keeps it when its score exceeds the
/// threshold. No NMS is applied here.
pub fn decode_yolov8(
    output: &[f32],
    shape: &[i64],
    classes: &[&str],
    params: &DecodeParams,
) -> Result<Vec<Detection>, VisionError> {
    let (features, candidates, transposed) = output_layout(shape, classes.len())?;

    let expected = features
        .checked_mul(candidates)
        .ok_or_else(|| VisionError::Ort("YOLO output size would overflow".to_string()))?;
    if output.len() != expected {
        return Err(VisionError::Ort(format!(
            "YOLO output has {} values, expected {}",
            output.len(),
            expected
        )));
    }

    let at = |feature: usize, i: usize| {
        if transposed {
            output[i * features + feature]
        } else {
            output[feature * candidates + i]
        }
    };

    let mut detections = Vec::new();
    for i in 0..candidates {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for class_id in 0..classes.len() {
            let score = at(BOX_FEATURES + class_id, i);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !best_score.is_finite() || best_score <= params.confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(
            at(0, i) * params.scale_x,
            at(1, i) * params.scale_y,
            at(2, i) * params.scale_x,
            at(3, i) * params.scale_y,
        );
        if !bbox.is_finite() {
            continue;
        }

        let bbox = bbox.clamp_to(params.frame_width, params.frame_height);
        if bbox.area() <= 0.0 {
            continue;
        }

        detections.push(Detection::new(
            classes[best_class],
            best_score.min(1.0),
            bbox,
        ));
    }

    Ok(detections)
}

/// Per-class non-maximum suppression, highest confidence first
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.label == candidate.label && k.bbox.iou(&candidate.bbox) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// YOLO model for object detection
pub struct YoloModel {
    session: Mutex<Session>,
    input_size: u32,
    confidence_threshold: f32,
    nms_threshold: f32,
}

impl YoloModel {
    /// Load the model at `model_path` with thresholds from `config`
    pub fn new(model_path: &Path, config: &VisionConfig) -> Result<Self, VisionError> {
        if !model_path.is_file() {
            return Err(VisionError::Model(format!("Model file not found: {:?}", model_path)));
        }

        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        info!("YOLO model loaded from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            nms_threshold: config.nms_threshold,
        })
    }

    /// Detect objects in a BGR frame
    pub fn detect(&self, frame: &Mat) -> Result<Vec<Detection>, VisionError> {
        let (width, height) = (frame.cols() as f32, frame.rows() as f32);
        let input = mat_to_chw_tensor(frame, self.input_size)?;
        let (shape, output) = self.infer(input)?;

        let size = self.input_size as f32;
        let params = DecodeParams {
            confidence_threshold: self.confidence_threshold,
            scale_x: width / size,
            scale_y: height / size,
            frame_width: width,
            frame_height: height,
        };

        let candidates = decode_yolov8(&output, &shape, COCO_CLASSES, &params)?;
        let detections = non_max_suppression(candidates, self.nms_threshold);
        debug!("YOLO detected {} objects", detections.len());
        Ok(detections)
    }

    /// Run one inference on a blank input; returns the number of candidate boxes
    pub fn warm_up(&self) -> Result<usize, VisionError> {
        let size = self.input_size as usize;
        let (shape, _) = self.infer(vec![0.0; 3 * size * size])?;
        let (_, candidates, _) = output_layout(&shape, COCO_CLASSES.len())?;
        Ok(candidates)
    }

    fn infer(&self, chw: Vec<f32>) -> Result<(Vec<i64>, Vec<f32>), VisionError> {
        let size = self.input_size as usize;
        let input = Tensor::from_array((vec![1usize, 3, size, size], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::Ort(format!("YOLO inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| VisionError::Ort("Missing output0 tensor".to_string()))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: &[&str] = &["person", "cup"];

    fn params() -> DecodeParams {
        DecodeParams {
            confidence_threshold: 0.25,
            scale_x: 1.0,
            scale_y: 1.0,
            frame_width: 640.0,
            frame_height: 640.0,
        }
    }

    /// Build a `[1, 6, n]` tensor from (cx, cy, w, h, person, cup) rows per candidate
    fn tensor(candidates: &[[f32; 6]]) -> (Vec<f32>, Vec<i64>) {
        let n = candidates.len();
        let mut data = vec![0.0; 6 * n];
        for (i, c) in candidates.iter().enumerate() {
            for (f, v) in c.iter().enumerate() {
                data[f * n + i] = *v;
            }
        }
        (data, vec![1, 6, n as i64])
    }

    #[test]
    fn test_decode_picks_best_class() {
        let (data, shape) = tensor(&[[100.0, 100.0, 20.0, 40.0, 0.1, 0.9]]);
        let detections = decode_yolov8(&data, &shape, CLASSES, &params()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "cup");
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(detections[0].bbox, BoundingBox::new(90.0, 80.0, 110.0, 120.0));
    }

    #[test]
    fn test_decode_applies_threshold() {
        let (data, shape) = tensor(&[
            [100.0, 100.0, 20.0, 20.0, 0.2, 0.1],
            [300.0, 300.0, 20.0, 20.0, 0.6, 0.1],
        ]);
        let detections = decode_yolov8(&data, &shape, CLASSES, &params()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");
    }

    #[test]
    fn test_decode_scales_and_clamps() {
        let (data, shape) = tensor(&[[320.0, 320.0, 640.0, 640.0, 0.8, 0.0]]);
        let p = DecodeParams {
            scale_x: 0.5,
            scale_y: 0.75,
            frame_width: 320.0,
            frame_height: 480.0,
            ..params()
        };
        let detections = decode_yolov8(&data, &shape, CLASSES, &p).unwrap();
        assert_eq!(detections[0].bbox, BoundingBox::new(0.0, 0.0, 320.0, 480.0));
    }

    #[test]
    fn test_decode_transposed_layout() {
        // [1, n, 6]: candidate-major
        let data = vec![50.0, 50.0, 10.0, 10.0, 0.7, 0.2];
        let detections = decode_yolov8(&data, &[1, 1, 6], CLASSES, &params()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "person");
    }

    #[test]
    fn test_decode_skips_non_finite() {
        let (data, shape) = tensor(&[[f32::NAN, 100.0, 20.0, 20.0, 0.9, 0.0]]);
        assert!(decode_yolov8(&data, &shape, CLASSES, &params()).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert!(decode_yolov8(&[0.0; 12], &[1, 4, 3], CLASSES, &params()).is_err());
        assert!(decode_yolov8(&[0.0; 5], &[1, 6, 1], CLASSES, &params()).is_err());
        assert!(decode_yolov8(&[], &[6, 1], CLASSES, &params()).is_err());
    }

    #[test]
    fn test_layout_for_coco_export() {
        assert_eq!(output_layout(&[1, 84, 8400], 80).unwrap(), (84, 8400, false));
        assert_eq!(output_layout(&[1, 8400, 84], 80).unwrap(), (84, 8400, true));
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let a = Detection::new("cup", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let b = Detection::new("cup", 0.8, BoundingBox::new(5.0, 5.0, 105.0, 105.0));
        let c = Detection::new("cup", 0.7, BoundingBox::new(300.0, 300.0, 400.0, 400.0));
        let kept = non_max_suppression(vec![b, c.clone(), a.clone()], 0.45);
        assert_eq!(kept, vec![a, c]);
    }

    #[test]
    fn test_nms_is_per_class() {
        let cup = Detection::new("cup", 0.9, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let person = Detection::new("person", 0.8, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let kept = non_max_suppression(vec![cup, person], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(COCO_CLASSES[67], "cell phone");
    }
}
