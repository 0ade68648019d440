//! Video frame source.
//!
//! Wraps an OpenCV `VideoCapture` into a lazy, finite, forward-only
//! sequence of timestamped raster frames. The decode handle is exclusive
//! and released when the source is dropped, on every exit path.

use std::path::Path;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{
    VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
    CAP_PROP_FRAME_WIDTH,
};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container reports a non-positive value.
pub const DEFAULT_FRAME_RATE: f64 = 25.0;

/// A decoded video source.
///
/// Not restartable: a second pass requires reopening the file.
pub struct FrameSource {
    cap: VideoCapture,
    frame_rate: f64,
    width: u32,
    height: u32,
    frame_count: u64,
    next_index: u64,
}

impl FrameSource {
    /// Open a video container for decoding.
    ///
    /// Fails with [`MediaError::SourceUnavailable`] when the container
    /// cannot be opened or reports no usable frames.
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();

        let cap = VideoCapture::from_file(&path_str, CAP_ANY)
            .map_err(|e| MediaError::source_unavailable(format!("{}: {}", path_str, e)))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::source_unavailable(format!(
                "could not open video: {}",
                path_str
            )));
        }

        let reported_fps = cap
            .get(CAP_PROP_FPS)
            .map_err(|e| MediaError::source_unavailable(e.to_string()))?;
        let frame_rate = if reported_fps > 0.0 {
            reported_fps
        } else {
            warn!(
                path = %path_str,
                reported = reported_fps,
                "container reports no frame rate, assuming {}", DEFAULT_FRAME_RATE
            );
            DEFAULT_FRAME_RATE
        };

        let width = cap.get(CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
        let height = cap.get(CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
        // Best-effort: some containers only approximate this.
        let frame_count = cap.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0).max(0.0) as u64;

        if width == 0 || height == 0 || frame_count == 0 {
            return Err(MediaError::source_unavailable(format!(
                "video has no usable frames: {}",
                path_str
            )));
        }

        debug!(
            path = %path_str,
            frame_rate,
            width,
            height,
            frame_count,
            "opened video source"
        );

        Ok(Self {
            cap,
            frame_rate,
            width,
            height,
            frame_count,
            next_index: 0,
        })
    }

    /// Frames per second, after the decode fallback.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total frame count as reported by the container (best-effort).
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. Indices increase
    /// strictly by one per decoded frame.
    pub fn read_frame(&mut self) -> MediaResult<Option<(u64, Mat)>> {
        let mut frame = Mat::default();
        let ok = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::source_unavailable(format!("decode failed: {}", e)))?;

        if !ok || frame.empty() {
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some((index, frame)))
    }
}
