//! lookout-assistant: the capture, detect, announce and render loop
//!
//! `Assistant` owns the announcement memory, the alert gate and the sending
//! half of the voice queue. It drives any frame source, detector and display
//! that implement the `lookout_core` pipeline traits.

pub mod assistant;

pub use assistant::{Assistant, FrameReport, RunSummary};
