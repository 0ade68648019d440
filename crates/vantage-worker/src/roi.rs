//! Region-of-interest creation and detection back-fill.

use tracing::info;

use vantage_models::{AuditEvent, DetectionId, Polygon, RoiId, VideoId};
use vantage_store::{DetectionStore, StoreError};

use crate::error::{WorkerError, WorkerResult};

/// Create an ROI and back-fill it onto the video's existing detections.
///
/// A detection belongs to the ROI when its bounding-box center lies
/// inside the polygon, boundary included. Runs once, synchronously, at
/// creation time; detections persisted afterwards are not retroactively
/// tested. When ROIs overlap, the most recent back-fill wins.
pub fn create_roi(
    store: &mut DetectionStore,
    video_id: VideoId,
    name: &str,
    points: Vec<(f64, f64)>,
) -> WorkerResult<RoiId> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WorkerError::invalid_roi("name must not be empty"));
    }
    let polygon = Polygon::new(points).map_err(|e| WorkerError::invalid_roi(e.to_string()))?;

    if store.get_video(video_id)?.is_none() {
        return Err(StoreError::NotFound(format!("video {}", video_id)).into());
    }

    let roi_id = store.insert_roi(video_id, name, &polygon)?;

    let detections = store.list_detections(video_id, None)?;
    let matching: Vec<DetectionId> = detections
        .iter()
        .filter(|det| {
            let (cx, cy) = det.bbox.center();
            polygon.contains(cx, cy)
        })
        .map(|det| det.id)
        .collect();

    let assigned = store.assign_roi(roi_id, &matching)?;
    store.record_audit_event(AuditEvent::RoiCreated, Some(video_id), Some(roi_id))?;

    info!(
        roi_id = %roi_id,
        video_id = %video_id,
        name,
        assigned,
        "ROI created"
    );
    Ok(roi_id)
}
