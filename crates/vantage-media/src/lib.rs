//! Frame-level machinery for the Vantage analytics pipeline.
//!
//! This crate provides:
//! - [`FrameSource`]: lazy, forward-only video decoding
//! - [`EntityTracker`]: YOLOv8 detection plus IoU tracking
//! - [`HeatmapAccumulator`]: streaming spatial density accumulation
//! - [`AnnotationRenderer`]: annotated output video writing

pub mod convert;
pub mod detector;
pub mod entity_tracker;
pub mod error;
pub mod heatmap;
pub mod renderer;
pub mod source;
pub mod tracker;

pub use detector::{DetectorConfig, PersonDetector, RawDetection, COCO_CLASSES};
pub use entity_tracker::EntityTracker;
pub use error::{MediaError, MediaResult};
pub use heatmap::{HeatmapAccumulator, HeatmapImage, BLUR_KERNEL, HEAT_RADIUS, HEAT_WEIGHT};
pub use renderer::AnnotationRenderer;
pub use source::{FrameSource, DEFAULT_FRAME_RATE};
pub use tracker::IoUTracker;
