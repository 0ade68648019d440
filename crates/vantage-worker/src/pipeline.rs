//! The per-video analysis pipeline.
//!
//! One call processes one uploaded file end to end: decode, detect and
//! track, persist, annotate, accumulate density, finalize. The caller
//! (the orchestrator) owns failure handling; any error here surfaces as
//! the job's failure.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use vantage_media::{
    AnnotationRenderer, DetectorConfig, EntityTracker, FrameSource, HeatmapAccumulator,
};
use vantage_models::{NewDetection, VideoId, VideoRecord};
use vantage_store::DetectionStore;

use crate::error::WorkerResult;

/// Minimum confidence for an observation to be persisted.
pub const CONF_THRESHOLD: f32 = 0.25;

/// Run the full analysis over one video.
///
/// Writes the annotated copy to `output_path` and, when any activity was
/// detected, a heatmap image at the same path with a `.png` extension.
/// Returns the created video's id.
///
/// The video row commits before the frame loop and detection rows commit
/// together after it, so a mid-run failure can leave a video with fewer
/// detections than were observed. Callers treat that as a failed job and
/// may delete the video to clean up.
pub fn process_video(
    video_path: &Path,
    output_path: &Path,
    store: &mut DetectionStore,
    detector_config: DetectorConfig,
) -> WorkerResult<VideoId> {
    let mut source = FrameSource::open(video_path)?;
    let frame_rate = source.frame_rate();
    let (width, height) = (source.width(), source.height());

    let mut renderer = AnnotationRenderer::open(output_path, frame_rate, width, height)?;

    let duration = VideoRecord::derive_duration(source.frame_count(), frame_rate);
    let video_id = store.insert_video(&video_path.to_string_lossy(), frame_rate, duration)?;

    info!(
        video_id = %video_id,
        frame_rate,
        width,
        height,
        frames = source.frame_count(),
        "processing video"
    );

    let mut heatmap = HeatmapAccumulator::new(width, height)?;
    let mut tracker = EntityTracker::new(detector_config)?;

    let mut pending: Vec<NewDetection> = Vec::new();
    let mut seen_this_frame: HashSet<i64> = HashSet::new();

    while let Some((frame_index, frame)) = source.read_frame()? {
        let timestamp = frame_index as f64 / frame_rate;
        let observations = tracker.track(&frame)?;

        seen_this_frame.clear();
        let mut accepted = Vec::new();
        for obs in observations {
            // Identity-less observations are discarded outright.
            let Some(track_id) = obs.track_id else {
                continue;
            };
            if !obs.is_person() || obs.confidence < CONF_THRESHOLD {
                continue;
            }
            // A tracker can rarely report the same id twice in one frame;
            // the first occurrence wins.
            if !seen_this_frame.insert(track_id) {
                continue;
            }

            pending.push(NewDetection {
                track_id,
                timestamp,
                bbox: obs.bbox,
            });

            let (cx, cy) = obs.bbox.center();
            heatmap.accumulate(cx, cy)?;
            accepted.push(obs);
        }

        let annotated = renderer.render(&frame, &accepted)?;
        renderer.append(&annotated)?;
    }

    // Release the decode and encode handles before committing.
    drop(source);
    drop(renderer);

    let persisted = store.insert_detections(video_id, &pending)?;
    debug!(video_id = %video_id, persisted, "detections committed");

    if let Some(image) = heatmap.finalize()? {
        let heatmap_path = output_path.with_extension("png");
        image.write(&heatmap_path)?;
        info!(video_id = %video_id, path = %heatmap_path.display(), "heatmap written");
    } else {
        info!(video_id = %video_id, "no activity detected, heatmap skipped");
    }

    Ok(video_id)
}
