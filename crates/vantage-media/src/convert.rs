//! BGR frame to RGB image conversion for inference input.

use image::{DynamicImage, ImageBuffer, Rgb};
use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;

use crate::error::{MediaError, MediaResult};

/// Convert a decoded BGR frame into an RGB image for the detector.
///
/// The frame is copied; the original Mat is never mutated.
pub fn mat_to_rgb(frame: &Mat) -> MediaResult<DynamicImage> {
    if frame.empty() {
        return Err(MediaError::detection_failed("empty frame"));
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)
        .map_err(|e| MediaError::detection_failed(format!("color conversion: {}", e)))?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    let data = rgb
        .data_bytes()
        .map_err(|e| MediaError::detection_failed(format!("frame data: {}", e)))?;

    let img_buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(width, height, data.to_vec())
            .ok_or_else(|| MediaError::internal("failed to create image buffer"))?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}
