//! lookout-core: shared types and decision logic for the Lookout assistant
//!
//! Holds everything that does not touch a camera, a model or a speaker:
//! detections and confidence tiers, the announcement memory, the alert
//! cooldown gate, the clock and shutdown primitives, and the pipeline traits
//! that the vision and assistant crates plug into.

pub mod error;
pub mod detection;
pub mod memory;
pub mod alert;
pub mod clock;
pub mod shutdown;
pub mod config;
pub mod pipeline;

pub use error::{Error, Result};
pub use detection::{BoundingBox, ConfidenceTier, Detection};
pub use memory::DetectionMemory;
pub use alert::{AlertGate, AlertRule};
pub use clock::{Clock, ManualClock, SystemClock};
pub use shutdown::Shutdown;
pub use config::{AlertConfig, AssistantConfig};
pub use pipeline::{FrameDisplay, FrameSource, KeyCommand, ObjectDetector, Overlay};
