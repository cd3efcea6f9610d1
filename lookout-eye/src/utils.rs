//! Utility functions for vision processing

use crate::error::VisionError;
use opencv::{core::Size, imgproc, prelude::*};

/// Largest tensor accepted, in elements
const MAX_TENSOR_ELEMENTS: usize = 100_000_000;

/// Convert interleaved 8-bit HWC pixels into planar CHW floats in [0, 1]
pub fn hwc_to_chw(data: &[u8], width: usize, height: usize, channels: usize) -> Result<Vec<f32>, VisionError> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(VisionError::Processing("Image dimensions cannot be zero".to_string()));
    }

    let plane = width
        .checked_mul(height)
        .ok_or_else(|| VisionError::Processing("Image dimensions would overflow".to_string()))?;
    let total = plane
        .checked_mul(channels)
        .ok_or_else(|| VisionError::Processing("Image dimensions would overflow".to_string()))?;

    if total > MAX_TENSOR_ELEMENTS {
        return Err(VisionError::Processing("Image too large (max 100M elements)".to_string()));
    }

    if data.len() < total {
        return Err(VisionError::Processing(format!(
            "Pixel buffer too small: {} bytes for {}x{}x{}",
            data.len(),
            width,
            height,
            channels
        )));
    }

    let mut chw = vec![0.0f32; total];
    for (i, pixel) in data[..total].chunks_exact(channels).enumerate() {
        for (c, value) in pixel.iter().enumerate() {
            chw[c * plane + i] = *value as f32 / 255.0;
        }
    }

    Ok(chw)
}

/// Resize a BGR frame to `size`x`size`, convert it to RGB and lay it out as CHW
pub fn mat_to_chw_tensor(frame: &Mat, size: u32) -> Result<Vec<f32>, VisionError> {
    if frame.rows() <= 0 || frame.cols() <= 0 {
        return Err(VisionError::Processing("Invalid image dimensions".to_string()));
    }

    if frame.channels() != 3 {
        return Err(VisionError::Processing(format!(
            "Expected a 3 channel frame, got {}",
            frame.channels()
        )));
    }

    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(size as i32, size as i32),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )
    .map_err(|e| VisionError::OpenCv(format!("Failed to resize frame: {}", e)))?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| VisionError::OpenCv(format!("Failed to convert color: {}", e)))?;

    let rgb = if rgb.is_continuous() { rgb } else { rgb.try_clone()? };
    let bytes = rgb
        .data_bytes()
        .map_err(|e| VisionError::OpenCv(format!("Failed to get Mat data: {}", e)))?;

    hwc_to_chw(bytes, size as usize, size as usize, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hwc_to_chw_layout() {
        // 2x1 image: pixel0 = (10, 20, 30), pixel1 = (40, 50, 60)
        let data = [10u8, 20, 30, 40, 50, 60];
        let chw = hwc_to_chw(&data, 2, 1, 3).unwrap();
        let expected: Vec<f32> = [10u8, 40, 20, 50, 30, 60].iter().map(|v| *v as f32 / 255.0).collect();
        assert_eq!(chw, expected);
    }

    #[test]
    fn test_hwc_to_chw_normalizes() {
        let chw = hwc_to_chw(&[0, 255, 0, 255], 2, 2, 1).unwrap();
        assert_eq!(chw, vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_hwc_to_chw_short_buffer() {
        assert!(hwc_to_chw(&[1, 2, 3], 2, 1, 3).is_err());
    }

    #[test]
    fn test_hwc_to_chw_zero_dimensions() {
        assert!(hwc_to_chw(&[], 0, 1, 3).is_err());
        assert!(hwc_to_chw(&[], 1, 1, 0).is_err());
    }

    #[test]
    fn test_hwc_to_chw_ignores_trailing_bytes() {
        let chw = hwc_to_chw(&[1, 2, 3, 99], 1, 1, 3).unwrap();
        assert_eq!(chw.len(), 3);
    }
}
