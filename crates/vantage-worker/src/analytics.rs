//! Aggregate analytics over persisted detections.

use std::collections::{BTreeMap, HashMap};

use vantage_models::{AnalyticsSummary, DetectionRecord, RoiId, VideoId};
use vantage_store::DetectionStore;

use crate::error::WorkerResult;

/// Compute the three-field summary over a detection set.
///
/// Order-invariant and idempotent: the same set yields the same summary
/// regardless of iteration order. Minute-bucket ties resolve to the
/// lowest minute index.
pub fn compute(detections: &[DetectionRecord]) -> AnalyticsSummary {
    if detections.is_empty() {
        return AnalyticsSummary::empty();
    }

    let mut track_spans: HashMap<i64, (f64, f64)> = HashMap::new();
    let mut minute_counts: BTreeMap<i64, u64> = BTreeMap::new();

    for det in detections {
        let span = track_spans
            .entry(det.track_id)
            .or_insert((det.timestamp, det.timestamp));
        span.0 = span.0.min(det.timestamp);
        span.1 = span.1.max(det.timestamp);

        let minute = (det.timestamp / 60.0).floor() as i64;
        *minute_counts.entry(minute).or_insert(0) += 1;
    }

    let total_people = track_spans.len() as u64;
    let dwell_sum: f64 = track_spans.values().map(|(first, last)| last - first).sum();
    let avg_dwell_time = round2(dwell_sum / track_spans.len() as f64);

    // Ascending iteration plus strict comparison keeps the lowest minute
    // on ties.
    let mut peak_minute = None;
    let mut peak_count = 0u64;
    for (&minute, &count) in &minute_counts {
        if count > peak_count {
            peak_count = count;
            peak_minute = Some(minute);
        }
    }

    AnalyticsSummary {
        total_people,
        avg_dwell_time,
        peak_minute,
    }
}

/// Summary for one video, optionally scoped to one ROI.
pub fn video_analytics(
    store: &DetectionStore,
    video_id: VideoId,
    roi_id: Option<RoiId>,
) -> WorkerResult<AnalyticsSummary> {
    let detections = store.list_detections(video_id, roi_id)?;
    Ok(compute(&detections))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_models::{BoundingBox, DetectionId};

    fn det(track_id: i64, timestamp: f64) -> DetectionRecord {
        DetectionRecord {
            id: DetectionId(0),
            video_id: VideoId(1),
            roi_id: None,
            track_id,
            timestamp,
            bbox: BoundingBox::new(10.0, 10.0, 50.0, 90.0),
        }
    }

    #[test]
    fn test_empty_set() {
        let summary = compute(&[]);
        assert_eq!(summary.total_people, 0);
        assert_eq!(summary.avg_dwell_time, 0.0);
        assert_eq!(summary.peak_minute, None);
    }

    #[test]
    fn test_single_stationary_person() {
        // One person observed on every frame of a 2-second, 10 fps video.
        let detections: Vec<_> = (0..20).map(|i| det(1, i as f64 / 10.0)).collect();
        let summary = compute(&detections);

        assert_eq!(summary.total_people, 1);
        assert_eq!(summary.avg_dwell_time, 1.9);
        assert_eq!(summary.peak_minute, Some(0));
    }

    #[test]
    fn test_distinct_tracks_counted_once() {
        let detections = vec![det(1, 0.0), det(1, 5.0), det(2, 1.0), det(3, 2.0)];
        assert_eq!(compute(&detections).total_people, 3);
    }

    #[test]
    fn test_order_invariance_and_idempotence() {
        let mut detections = vec![det(2, 61.0), det(1, 0.0), det(1, 30.0), det(2, 62.0)];
        let forward = compute(&detections);
        detections.reverse();
        let backward = compute(&detections);

        assert_eq!(forward, backward);
        assert_eq!(forward, compute(&detections));
    }

    #[test]
    fn test_avg_dwell_rounding() {
        // Track 1 dwells 1.234 s, track 2 dwells 2.0 s -> mean 1.617.
        let detections = vec![det(1, 0.0), det(1, 1.234), det(2, 10.0), det(2, 12.0)];
        assert_eq!(compute(&detections).avg_dwell_time, 1.62);
    }

    #[test]
    fn test_peak_minute_tie_breaks_low() {
        // Two detections in minute 0 and two in minute 2.
        let detections = vec![det(1, 10.0), det(1, 20.0), det(2, 130.0), det(2, 140.0)];
        assert_eq!(compute(&detections).peak_minute, Some(0));
    }

    #[test]
    fn test_peak_minute_prefers_busier_bucket() {
        let detections = vec![det(1, 10.0), det(2, 70.0), det(2, 75.0), det(2, 80.0)];
        assert_eq!(compute(&detections).peak_minute, Some(1));
    }
}
