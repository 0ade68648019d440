//! Video metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a processed video.
///
/// Assigned by the store when the video row is created; detections and
/// ROIs reference it by foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub i64);

impl VideoId {
    /// Get the inner row id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VideoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A processed video's persisted metadata.
///
/// Created exactly once per successfully-opened source, before any
/// detection is persisted. Never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Store-assigned id
    pub id: VideoId,

    /// Source filename as uploaded
    pub filename: String,

    /// Frames per second reported by the container (or the decode fallback)
    pub frame_rate: f64,

    /// Duration in seconds, derived from frame count and frame rate
    pub duration: f64,
}

impl VideoRecord {
    /// Derive the duration for a video from its frame count and rate.
    ///
    /// Returns 0 when the frame rate is not a positive number.
    pub fn derive_duration(frame_count: u64, frame_rate: f64) -> f64 {
        if frame_rate > 0.0 {
            frame_count as f64 / frame_rate
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_duration() {
        assert_eq!(VideoRecord::derive_duration(300, 30.0), 10.0);
        assert_eq!(VideoRecord::derive_duration(0, 30.0), 0.0);
    }

    #[test]
    fn test_derive_duration_invalid_rate() {
        assert_eq!(VideoRecord::derive_duration(300, 0.0), 0.0);
        assert_eq!(VideoRecord::derive_duration(300, -25.0), 0.0);
    }
}
