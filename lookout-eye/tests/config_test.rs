//! Tests for VisionConfig parsing

use lookout_eye::VisionConfig;

#[test]
fn test_partial_json_uses_defaults() {
    let config: VisionConfig =
        serde_json::from_str(r#"{"camera_id": 2, "confidence_threshold": 0.4, "show_window": false}"#).unwrap();

    assert_eq!(config.camera_id, 2);
    assert_eq!(config.confidence_threshold, 0.4);
    assert!(!config.show_window);
    assert_eq!(config.frame_rate, 30);
    assert_eq!(config.resolution, (640, 480));
    assert_eq!(config.model_file, "yolov8n.onnx");
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_model_location() {
    let config = VisionConfig::default();
    let path = config.model_file_path();
    assert!(path.to_string_lossy().contains(".lookout"));
    assert!(path.ends_with("models/yolov8n.onnx"));
}
