//! Detector + tracker composition.
//!
//! One [`EntityTracker`] owns one detection model and one tracking
//! session; it is created once per pipeline run and never shared across
//! jobs, so track identities cannot leak between videos.

use opencv::core::Mat;

use vantage_models::Observation;

use crate::convert::mat_to_rgb;
use crate::detector::{DetectorConfig, PersonDetector};
use crate::error::MediaResult;
use crate::tracker::IoUTracker;

/// IoU threshold for frame-to-frame identity matching.
const TRACK_IOU_THRESHOLD: f64 = 0.3;
/// Frames a track survives without a matching detection.
const TRACK_MAX_GAP: u32 = 30;

/// Stateful per-video detection and tracking capability.
pub struct EntityTracker {
    detector: PersonDetector,
    tracker: IoUTracker,
}

impl EntityTracker {
    /// Load the model and start a fresh tracking session.
    ///
    /// Expensive; call once per pipeline run, never per frame.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        let detector = PersonDetector::new(config)?;
        Ok(Self {
            detector,
            tracker: IoUTracker::new(TRACK_IOU_THRESHOLD, TRACK_MAX_GAP),
        })
    }

    /// Detect and track all objects in one frame.
    ///
    /// Observations come back in detector order with identities assigned
    /// by the tracking session. Class and confidence filtering is the
    /// caller's policy, not this component's.
    pub fn track(&mut self, frame: &Mat) -> MediaResult<Vec<Observation>> {
        let rgb = mat_to_rgb(frame)?;
        let detections = self.detector.detect(&rgb)?;
        Ok(self.tracker.update(&detections))
    }
}
