//! Annotated video output.

use std::path::Path;

use opencv::core::{Mat, Point, Rect, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;

use vantage_models::Observation;

use crate::error::{MediaError, MediaResult};

/// BGR color used for boxes and labels.
const ANNOTATION_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const BOX_THICKNESS: i32 = 2;
const FONT_SCALE: f64 = 0.6;

/// Writes an annotated copy of the source video.
///
/// Frames are appended in call order; the writer holds the output
/// container open until dropped.
pub struct AnnotationRenderer {
    writer: VideoWriter,
}

impl AnnotationRenderer {
    /// Create the output container.
    ///
    /// Fails with [`MediaError::SinkUnavailable`] when the container or
    /// codec cannot be created.
    pub fn open(path: impl AsRef<Path>, frame_rate: f64, width: u32, height: u32) -> MediaResult<Self> {
        let path = path.as_ref().to_string_lossy();

        let fourcc = VideoWriter::fourcc('a', 'v', 'c', '1')
            .map_err(|e| MediaError::sink_unavailable(format!("codec: {}", e)))?;
        let writer = VideoWriter::new(
            &path,
            fourcc,
            frame_rate,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(|e| MediaError::sink_unavailable(format!("{}: {}", path, e)))?;

        if !writer.is_opened().unwrap_or(false) {
            return Err(MediaError::sink_unavailable(format!(
                "could not create output video: {}",
                path
            )));
        }

        Ok(Self { writer })
    }

    /// Draw the observations onto a copy of the frame.
    ///
    /// The input frame is never mutated; persisted coordinates always
    /// reflect the unaltered source.
    pub fn render(&self, frame: &Mat, observations: &[Observation]) -> MediaResult<Mat> {
        let mut annotated = frame
            .try_clone()
            .map_err(|e| MediaError::internal(format!("frame copy: {}", e)))?;

        let color = Scalar::new(ANNOTATION_COLOR.0, ANNOTATION_COLOR.1, ANNOTATION_COLOR.2, 0.0);

        for obs in observations {
            let rect = Rect::new(
                obs.bbox.x1 as i32,
                obs.bbox.y1 as i32,
                obs.bbox.width().max(1.0) as i32,
                obs.bbox.height().max(1.0) as i32,
            );
            imgproc::rectangle(&mut annotated, rect, color, BOX_THICKNESS, imgproc::LINE_8, 0)
                .map_err(|e| MediaError::internal(format!("draw box: {}", e)))?;

            let label = match obs.track_id {
                Some(id) => format!("ID {} | {:.2}", id, obs.confidence),
                None => format!("{:.2}", obs.confidence),
            };
            imgproc::put_text(
                &mut annotated,
                &label,
                Point::new(rect.x, rect.y - 8),
                imgproc::FONT_HERSHEY_SIMPLEX,
                FONT_SCALE,
                color,
                BOX_THICKNESS,
                imgproc::LINE_8,
                false,
            )
            .map_err(|e| MediaError::internal(format!("draw label: {}", e)))?;
        }

        Ok(annotated)
    }

    /// Append a rendered frame to the output stream.
    pub fn append(&mut self, frame: &Mat) -> MediaResult<()> {
        self.writer
            .write(frame)
            .map_err(|e| MediaError::sink_unavailable(format!("frame write: {}", e)))
    }
}
