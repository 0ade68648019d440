//! Spatial density heatmap.
//!
//! Accumulation runs inline with the frame loop (cheap, streaming);
//! normalization needs global statistics and happens once in
//! [`HeatmapAccumulator::finalize`].

use std::path::Path;

use opencv::core::{self, Mat, Scalar, Size, CV_32FC1};
use opencv::imgcodecs;
use opencv::imgproc;
use opencv::prelude::*;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Radius of the density disk stamped per observation, in pixels.
pub const HEAT_RADIUS: i64 = 20;
/// Weight added per stamped pixel.
pub const HEAT_WEIGHT: f32 = 1.5;
/// Gaussian kernel side, must be odd.
pub const BLUR_KERNEL: i32 = 51;

/// Per-pixel running density buffer sized to the video's dimensions.
pub struct HeatmapAccumulator {
    buffer: Mat,
    width: i64,
    height: i64,
}

impl HeatmapAccumulator {
    /// Create a zeroed accumulator.
    pub fn new(width: u32, height: u32) -> MediaResult<Self> {
        let buffer = Mat::new_rows_cols_with_default(
            height as i32,
            width as i32,
            CV_32FC1,
            Scalar::all(0.0),
        )
        .map_err(|e| MediaError::internal(format!("heatmap buffer: {}", e)))?;

        Ok(Self {
            buffer,
            width: width as i64,
            height: height as i64,
        })
    }

    /// Add a fixed-radius, fixed-weight filled disk centered at (x, y).
    ///
    /// Out-of-bounds centers are ignored. Repeated hits at the same
    /// location accumulate additively, uncapped.
    pub fn accumulate(&mut self, x: f64, y: f64) -> MediaResult<()> {
        let cx = x as i64;
        let cy = y as i64;
        if cx < 0 || cy < 0 || cx >= self.width || cy >= self.height {
            return Ok(());
        }

        let width = self.width;
        let height = self.height;
        let data = self
            .buffer
            .data_typed_mut::<f32>()
            .map_err(|e| MediaError::internal(format!("heatmap data: {}", e)))?;

        for dy in -HEAT_RADIUS..=HEAT_RADIUS {
            let yy = cy + dy;
            if yy < 0 || yy >= height {
                continue;
            }
            for dx in -HEAT_RADIUS..=HEAT_RADIUS {
                let xx = cx + dx;
                if xx < 0 || xx >= width {
                    continue;
                }
                if dx * dx + dy * dy <= HEAT_RADIUS * HEAT_RADIUS {
                    data[(yy * width + xx) as usize] += HEAT_WEIGHT;
                }
            }
        }

        Ok(())
    }

    /// Normalize and color-map the accumulated density.
    ///
    /// Returns `None` when no activity was ever accumulated. The blur
    /// runs twice; a single pass leaves visible per-detection disks.
    pub fn finalize(self) -> MediaResult<Option<HeatmapImage>> {
        let mut max_val = 0.0;
        core::min_max_loc(
            &self.buffer,
            None,
            Some(&mut max_val),
            None,
            None,
            &core::no_array(),
        )
        .map_err(|e| MediaError::internal(format!("heatmap max: {}", e)))?;

        if max_val <= 0.0 {
            debug!("heatmap buffer is empty, no image produced");
            return Ok(None);
        }

        let kernel = Size::new(BLUR_KERNEL, BLUR_KERNEL);
        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(&self.buffer, &mut blurred, kernel, 0.0)
            .map_err(|e| MediaError::internal(format!("heatmap blur: {}", e)))?;
        let mut smoothed = Mat::default();
        imgproc::gaussian_blur_def(&blurred, &mut smoothed, kernel, 0.0)
            .map_err(|e| MediaError::internal(format!("heatmap blur: {}", e)))?;

        // Normalization ceiling is the 99th percentile, with the max as
        // fallback for degenerate near-empty buffers.
        let values = smoothed
            .data_typed::<f32>()
            .map_err(|e| MediaError::internal(format!("heatmap data: {}", e)))?;
        let mut ceiling = percentile(values, 99.0) as f64;
        if ceiling <= 0.0 {
            core::min_max_loc(
                &smoothed,
                None,
                Some(&mut ceiling),
                None,
                None,
                &core::no_array(),
            )
            .map_err(|e| MediaError::internal(format!("heatmap max: {}", e)))?;
        }

        // convert_scale_abs both rescales to [0, 255] and saturates
        // anything above the ceiling.
        let mut scaled = Mat::default();
        core::convert_scale_abs(&smoothed, &mut scaled, 255.0 / ceiling, 0.0)
            .map_err(|e| MediaError::internal(format!("heatmap scale: {}", e)))?;

        let mut colored = Mat::default();
        imgproc::apply_color_map(&scaled, &mut colored, imgproc::COLORMAP_JET)
            .map_err(|e| MediaError::internal(format!("heatmap colormap: {}", e)))?;

        Ok(Some(HeatmapImage { mat: colored }))
    }
}

/// A finalized, color-mapped heatmap.
pub struct HeatmapImage {
    mat: Mat,
}

impl HeatmapImage {
    /// Write the image to disk (format derived from the extension).
    pub fn write(&self, path: impl AsRef<Path>) -> MediaResult<()> {
        let path = path.as_ref().to_string_lossy();
        let written = imgcodecs::imwrite(&path, &self.mat, &core::Vector::new())
            .map_err(|e| MediaError::internal(format!("heatmap write: {}", e)))?;
        if !written {
            return Err(MediaError::internal(format!(
                "failed to write heatmap image: {}",
                path
            )));
        }
        Ok(())
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.mat.cols() as u32
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.mat.rows() as u32
    }
}

/// Linear-interpolated percentile over an unsorted sample.
fn percentile(values: &[f32], p: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (sorted.len() - 1) as f64 * p / 100.0;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let weight = (rank - lo as f64) as f32;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_finalizes_to_none() {
        let acc = HeatmapAccumulator::new(64, 64).unwrap();
        assert!(acc.finalize().unwrap().is_none());
    }

    #[test]
    fn test_out_of_bounds_hits_are_ignored() {
        let mut acc = HeatmapAccumulator::new(64, 64).unwrap();
        acc.accumulate(-5.0, 10.0).unwrap();
        acc.accumulate(10.0, 64.0).unwrap();
        acc.accumulate(1000.0, 1000.0).unwrap();
        assert!(acc.finalize().unwrap().is_none());
    }

    #[test]
    fn test_hits_accumulate_additively() {
        let mut acc = HeatmapAccumulator::new(64, 64).unwrap();
        acc.accumulate(32.0, 32.0).unwrap();
        acc.accumulate(32.0, 32.0).unwrap();

        let data = acc.buffer.data_typed::<f32>().unwrap();
        let center = data[32 * 64 + 32];
        assert!((center - 2.0 * HEAT_WEIGHT).abs() < 1e-6);
    }

    #[test]
    fn test_finalize_produces_color_image() {
        let mut acc = HeatmapAccumulator::new(64, 64).unwrap();
        acc.accumulate(32.0, 32.0).unwrap();

        let image = acc.finalize().unwrap().expect("activity present");
        assert_eq!(image.width(), 64);
        assert_eq!(image.height(), 64);
    }

    #[test]
    fn test_percentile_interpolation() {
        let values: Vec<f32> = (0..=100).map(|v| v as f32).collect();
        assert!((percentile(&values, 99.0) - 99.0).abs() < 1e-6);
        assert!((percentile(&values, 50.0) - 50.0).abs() < 1e-6);
        assert_eq!(percentile(&[], 99.0), 0.0);
    }
}
