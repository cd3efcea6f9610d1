//! Seams between the capture loop and its collaborators
//!
//! The loop only ever talks to a frame source, a detector and a display
//! through these traits, so the camera, the model and the window can be
//! swapped for scripted stand-ins.

use crate::detection::Detection;
use crate::error::Result;

/// Help line shown at the bottom of the window
pub const HELP_TEXT: &str = "Press 'q' to quit, 's' to speak status";

/// Produces frames, e.g. a webcam
pub trait FrameSource {
    type Frame;

    /// Next frame, or `None` when the stream has ended
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

/// Finds objects in a frame
pub trait ObjectDetector<F> {
    fn detect(&self, frame: &F) -> Result<Vec<Detection>>;
}

/// Draws detections and overlay on a frame, shows it and polls the keyboard
pub trait FrameDisplay<F> {
    fn show(&mut self, frame: &mut F, detections: &[Detection], overlay: &Overlay) -> Result<Option<KeyCommand>>;
}

/// Interactive commands recognized by the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    SpeakStatus,
}

impl KeyCommand {
    /// Map a key code as returned by a HighGUI-style key poll
    pub fn from_key(code: i32) -> Option<Self> {
        if code < 0 {
            return None;
        }
        match code & 0xFF {
            k if k == i32::from(b'q') || k == 27 => Some(KeyCommand::Quit),
            k if k == i32::from(b's') => Some(KeyCommand::SpeakStatus),
            _ => None,
        }
    }
}

/// Per-frame overlay state handed to the display
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Labels currently remembered
    pub memory_count: usize,
    /// Alert banner to draw, if a trigger object is in frame
    pub alert_banner: Option<String>,
    /// Local wall-clock time, `HH:MM:SS`
    pub timestamp: String,
    pub help: &'static str,
}

impl Overlay {
    pub fn memory_line(&self) -> String {
        format!("Objects in memory: {}", self.memory_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyCommand::from_key(i32::from(b'q')), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key(27), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key(i32::from(b's')), Some(KeyCommand::SpeakStatus));
        assert_eq!(KeyCommand::from_key(i32::from(b'x')), None);
        assert_eq!(KeyCommand::from_key(-1), None);
    }

    #[test]
    fn test_key_mapping_masks_modifier_bits() {
        // Some backends report extra high bits
        assert_eq!(KeyCommand::from_key(0x10_0000 | i32::from(b'q')), Some(KeyCommand::Quit));
    }

    #[test]
    fn test_arrow_keys_are_ignored() {
        // GTK arrow codes whose low byte is 'Q' (left) and 'S' (right)
        assert_eq!(KeyCommand::from_key(0xFF51), None);
        assert_eq!(KeyCommand::from_key(0xFF53), None);
        assert_eq!(KeyCommand::from_key(i32::from(b'Q')), None);
        assert_eq!(KeyCommand::from_key(i32::from(b'S')), None);
    }

    #[test]
    fn test_memory_line() {
        let overlay = Overlay {
            memory_count: 3,
            alert_banner: None,
            timestamp: "12:00:00".to_string(),
            help: HELP_TEXT,
        };
        assert_eq!(overlay.memory_line(), "Objects in memory: 3");
    }
}
