//! Detection and bounding-box models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::roi::RoiId;
use crate::video::VideoId;

/// COCO class id for "person", the only class the pipeline persists.
pub const PERSON_CLASS_ID: usize = 0;

/// Unique identifier for a persisted detection row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DetectionId(pub i64);

impl DetectionId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DetectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned bounding box in source pixel coordinates.
///
/// Corner representation: `x1 < x2`, `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x1: f64,
    /// Top edge y-coordinate
    pub y1: f64,
    /// Right edge x-coordinate
    pub x2: f64,
    /// Bottom edge y-coordinate
    pub y2: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width in pixels.
    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point of the box.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Whether the corner ordering invariant holds.
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Compute Intersection over Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// One detector/tracker output for a single frame.
///
/// `track_id` is assigned by the tracking capability and is `None` when no
/// identity has been established yet; the pipeline discards those.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Identity stable across frames within one video's run
    pub track_id: Option<i64>,
    /// COCO class id
    pub class_id: usize,
    /// Detection confidence [0, 1]
    pub confidence: f32,
    /// Bounding box in source pixel coordinates
    pub bbox: BoundingBox,
}

impl Observation {
    /// Check if this is a person observation.
    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }
}

/// A detection row about to be persisted (no id yet).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewDetection {
    /// Track identity within the owning video
    pub track_id: i64,
    /// Seconds from video start (frame index / frame rate)
    pub timestamp: f64,
    /// Bounding box in source pixel coordinates
    pub bbox: BoundingBox,
}

/// A persisted detection row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionRecord {
    /// Store-assigned id
    pub id: DetectionId,
    /// Owning video
    pub video_id: VideoId,
    /// Owning ROI, back-filled by ROI assignment (unset until then)
    pub roi_id: Option<RoiId>,
    /// Track identity, scoped to the owning video
    pub track_id: i64,
    /// Seconds from video start
    pub timestamp: f64,
    /// Bounding box in source pixel coordinates
    pub bbox: BoundingBox,
}
