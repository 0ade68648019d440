//! IoU-based multi-object tracker.
//!
//! Maintains identity across frames by greedy Intersection-over-Union
//! matching between the previous frame's tracks and the current frame's
//! detections. Identity is scoped to one tracking session (one video).

use std::collections::HashMap;

use vantage_models::{BoundingBox, Observation};

use crate::detector::RawDetection;

/// Internal per-track state.
#[derive(Debug, Clone)]
struct Track {
    /// Last known bounding box
    bbox: BoundingBox,
    /// Class the track was created with; matches are class-constrained
    class_id: usize,
    /// Frames since last detection
    age: u32,
}

/// Greedy IoU tracker.
pub struct IoUTracker {
    /// IoU threshold for matching
    iou_threshold: f64,
    /// Maximum gap frames before a track is dropped
    max_gap: u32,
    tracks: HashMap<i64, Track>,
    /// Next identity to assign; starts at 1 so persisted ids are positive
    next_track_id: i64,
}

impl IoUTracker {
    /// Create a new tracker.
    pub fn new(iou_threshold: f64, max_gap: u32) -> Self {
        Self {
            iou_threshold,
            max_gap,
            tracks: HashMap::new(),
            next_track_id: 1,
        }
    }

    /// Associate one frame's detections with tracks.
    ///
    /// Every detection comes back as an [`Observation`] carrying its
    /// assigned identity; unmatched detections open new tracks. Tracks
    /// unseen for more than `max_gap` frames are dropped.
    pub fn update(&mut self, detections: &[RawDetection]) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(detections.len());
        let mut unmatched_tracks: Vec<i64> = self.tracks.keys().copied().collect();

        for det in detections {
            let mut best_iou = self.iou_threshold;
            let mut best_track: Option<i64> = None;

            for &track_id in &unmatched_tracks {
                if let Some(track) = self.tracks.get(&track_id) {
                    if track.class_id != det.class_id {
                        continue;
                    }
                    let iou = det.bbox.iou(&track.bbox);
                    if iou > best_iou {
                        best_iou = iou;
                        best_track = Some(track_id);
                    }
                }
            }

            let track_id = match best_track {
                Some(id) => {
                    unmatched_tracks.retain(|&t| t != id);
                    id
                }
                None => {
                    let id = self.next_track_id;
                    self.next_track_id += 1;
                    id
                }
            };

            self.tracks.insert(
                track_id,
                Track {
                    bbox: det.bbox,
                    class_id: det.class_id,
                    age: 0,
                },
            );

            observations.push(Observation {
                track_id: Some(track_id),
                class_id: det.class_id,
                confidence: det.confidence,
                bbox: det.bbox,
            });
        }

        // Age and prune tracks that were not matched this frame.
        for track_id in unmatched_tracks {
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.age += 1;
                if track.age > self.max_gap {
                    self.tracks.remove(&track_id);
                }
            }
        }

        observations
    }

    /// Drop all tracks and restart identity assignment.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_track_id = 1;
    }

    /// Number of tracks currently alive (matched or within the gap).
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64) -> RawDetection {
        RawDetection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            class_id: 0,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_new_detections_open_tracks() {
        let mut tracker = IoUTracker::new(0.3, 10);

        let tracked = tracker.update(&[
            det(100.0, 100.0, 150.0, 150.0),
            det(200.0, 200.0, 250.0, 250.0),
        ]);

        assert_eq!(tracked.len(), 2);
        assert_eq!(tracked[0].track_id, Some(1));
        assert_eq!(tracked[1].track_id, Some(2));
    }

    #[test]
    fn test_identity_persists_across_frames() {
        let mut tracker = IoUTracker::new(0.3, 10);

        let first = tracker.update(&[det(100.0, 100.0, 150.0, 150.0)]);
        let first_id = first[0].track_id;

        // Slightly moved box keeps its identity.
        let second = tracker.update(&[det(105.0, 105.0, 155.0, 155.0)]);
        assert_eq!(second[0].track_id, first_id);
    }

    #[test]
    fn test_class_constrained_matching() {
        let mut tracker = IoUTracker::new(0.3, 10);

        tracker.update(&[det(100.0, 100.0, 150.0, 150.0)]);

        // Same place, different class: must open a new track.
        let other_class = RawDetection {
            bbox: BoundingBox::new(100.0, 100.0, 150.0, 150.0),
            class_id: 2,
            confidence: 0.9,
        };
        let tracked = tracker.update(&[other_class]);
        assert_eq!(tracked[0].track_id, Some(2));
    }

    #[test]
    fn test_gap_handling() {
        let mut tracker = IoUTracker::new(0.3, 2);

        tracker.update(&[det(100.0, 100.0, 150.0, 150.0)]);
        tracker.update(&[]);
        tracker.update(&[]);
        assert_eq!(tracker.track_count(), 1);

        // One past the gap: the track is dropped.
        tracker.update(&[]);
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_reset() {
        let mut tracker = IoUTracker::new(0.3, 10);
        tracker.update(&[det(100.0, 100.0, 150.0, 150.0)]);
        tracker.reset();

        assert_eq!(tracker.track_count(), 0);
        let tracked = tracker.update(&[det(100.0, 100.0, 150.0, 150.0)]);
        assert_eq!(tracked[0].track_id, Some(1));
    }
}
