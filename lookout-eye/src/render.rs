//! Frame annotation and the preview window
//!
//! Boxes are colored by confidence tier; the overlay carries the title, the
//! clock, the memory count, the help line and the alert banner.

use crate::config::VisionConfig;
use crate::error::VisionError;
use lookout_core::{ConfidenceTier, Detection, FrameDisplay, KeyCommand, Overlay};
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    highgui, imgproc,
    prelude::*,
};
use tracing::{debug, info, warn};

/// Title drawn at the top-left of every frame
pub const TITLE_TEXT: &str = "Lookout Object Detection Assistant";

const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;
const LABEL_SCALE: f64 = 0.6;
const LABEL_THICKNESS: i32 = 2;
const WHITE: (u8, u8, u8) = (255, 255, 255);
const GREY: (u8, u8, u8) = (200, 200, 200);
const RED: (u8, u8, u8) = (0, 0, 255);

fn scalar((b, g, r): (u8, u8, u8)) -> Scalar {
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

/// Filled background behind a box caption: (x, y, width, height)
///
/// Sits on top of the box edge, or just inside it when the box touches the top of the frame.
pub fn caption_background(x1: i32, y1: i32, text_width: i32, text_height: i32) -> (i32, i32, i32, i32) {
    let height = text_height + 10;
    let top = if y1 - height < 0 { y1 } else { y1 - height };
    (x1.max(0), top.max(0), text_width.max(0), height)
}

/// Baseline origin of the caption text for a given background top
pub fn caption_origin(x1: i32, background_top: i32, text_height: i32) -> (i32, i32) {
    (x1.max(0), background_top + text_height + 5)
}

/// Draws detections and the overlay, shows the window and polls keys
pub struct OverlayRenderer {
    window_title: String,
    show_window: bool,
    window_created: bool,
}

impl OverlayRenderer {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            window_title: config.window_title.clone(),
            show_window: config.show_window,
            window_created: false,
        }
    }

    /// Renderer that never opens a window and never reports keys
    pub fn headless() -> Self {
        Self {
            window_title: String::new(),
            show_window: false,
            window_created: false,
        }
    }

    pub fn is_headless(&self) -> bool {
        !self.show_window
    }

    /// Draw boxes, captions and overlay text onto `frame`
    pub fn draw(&self, frame: &mut Mat, detections: &[Detection], overlay: &Overlay) -> Result<(), VisionError> {
        for detection in detections {
            self.draw_detection(frame, detection)?;
        }
        self.draw_overlay(frame, overlay)
    }

    fn draw_detection(&self, frame: &mut Mat, detection: &Detection) -> Result<(), VisionError> {
        let color = scalar(ConfidenceTier::from_confidence(detection.confidence).bgr());
        let bbox = detection.bbox;
        let (x1, y1) = (bbox.x1.round() as i32, bbox.y1.round() as i32);
        let (x2, y2) = (bbox.x2.round() as i32, bbox.y2.round() as i32);

        imgproc::rectangle(
            frame,
            Rect::new(x1, y1, (x2 - x1).max(1), (y2 - y1).max(1)),
            color,
            2,
            imgproc::LINE_8,
            0,
        )?;

        let caption = detection.caption();
        let mut baseline = 0;
        let text = imgproc::get_text_size(&caption, FONT, LABEL_SCALE, LABEL_THICKNESS, &mut baseline)?;

        let (bx, by, bw, bh) = caption_background(x1, y1, text.width, text.height);
        imgproc::rectangle(frame, Rect::new(bx, by, bw, bh), color, imgproc::FILLED, imgproc::LINE_8, 0)?;

        let (tx, ty) = caption_origin(x1, by, text.height);
        imgproc::put_text(
            frame,
            &caption,
            Point::new(tx, ty),
            FONT,
            LABEL_SCALE,
            scalar(WHITE),
            LABEL_THICKNESS,
            imgproc::LINE_8,
            false,
        )?;

        Ok(())
    }

    fn draw_overlay(&self, frame: &mut Mat, overlay: &Overlay) -> Result<(), VisionError> {
        let (width, height) = (frame.cols(), frame.rows());

        let lines = [
            (TITLE_TEXT.to_string(), Point::new(10, 30), 0.7, WHITE, 2),
            (overlay.help.to_string(), Point::new(10, height - 20), 0.5, GREY, 1),
            (overlay.memory_line(), Point::new(10, height - 40), 0.5, GREY, 1),
            (overlay.timestamp.clone(), Point::new(width - 100, 30), 0.6, GREY, 1),
        ];
        for (text, origin, scale, color, thickness) in lines {
            imgproc::put_text(frame, &text, origin, FONT, scale, scalar(color), thickness, imgproc::LINE_8, false)?;
        }

        if let Some(ref banner) = overlay.alert_banner {
            imgproc::put_text(frame, banner, Point::new(50, 50), FONT, 1.0, scalar(RED), 3, imgproc::LINE_8, false)?;
        }

        Ok(())
    }

    fn ensure_window(&mut self) -> Result<(), VisionError> {
        if !self.window_created {
            highgui::named_window(&self.window_title, highgui::WINDOW_AUTOSIZE)
                .map_err(|e| VisionError::Render(format!("Failed to create window: {}", e)))?;
            self.window_created = true;
            info!("Opened preview window {:?}", self.window_title);
        }
        Ok(())
    }

    /// Annotate and display `frame`, then poll the keyboard for 1 ms
    pub fn present(
        &mut self,
        frame: &mut Mat,
        detections: &[Detection],
        overlay: &Overlay,
    ) -> Result<Option<KeyCommand>, VisionError> {
        if !self.show_window {
            return Ok(None);
        }

        self.draw(frame, detections, overlay)?;
        self.ensure_window()?;

        highgui::imshow(&self.window_title, &*frame)
            .map_err(|e| VisionError::Render(format!("Failed to show frame: {}", e)))?;
        let key = highgui::wait_key(1)
            .map_err(|e| VisionError::Render(format!("Failed to poll keyboard: {}", e)))?;

        let command = KeyCommand::from_key(key);
        if let Some(command) = command {
            debug!("Key {} -> {:?}", key, command);
        }
        Ok(command)
    }
}

impl FrameDisplay<Mat> for OverlayRenderer {
    fn show(
        &mut self,
        frame: &mut Mat,
        detections: &[Detection],
        overlay: &Overlay,
    ) -> lookout_core::Result<Option<KeyCommand>> {
        Ok(self.present(frame, detections, overlay)?)
    }
}

impl Drop for OverlayRenderer {
    fn drop(&mut self) {
        if self.window_created {
            if let Err(e) = highgui::destroy_all_windows() {
                warn!("Failed to close windows: {}", e);
            }
        }
    }
}
