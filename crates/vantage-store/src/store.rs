//! SQLite-backed detection store.
//!
//! One `DetectionStore` wraps one connection and acts as the unit of work
//! for a single job: opened when the job starts, dropped when it ends,
//! never shared across jobs.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use vantage_models::{
    AuditEvent, AuditRecord, BoundingBox, DetectionId, DetectionRecord, NewDetection, Polygon,
    RoiId, RoiRecord, VideoId, VideoRecord,
};

use crate::error::{StoreError, StoreResult};

/// Persistent store for videos, detections, ROIs and audit events.
pub struct DetectionStore {
    conn: Connection,
}

impl DetectionStore {
    /// Open (and migrate) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store, mainly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.execute_batch(include_str!("../schema.sql"))?;
        Ok(Self { conn })
    }

    /// Persist a video's metadata. Called once, before any detection.
    pub fn insert_video(
        &mut self,
        filename: &str,
        frame_rate: f64,
        duration: f64,
    ) -> StoreResult<VideoId> {
        self.conn.execute(
            "INSERT INTO videos (filename, frame_rate, duration) VALUES (?1, ?2, ?3)",
            params![filename, frame_rate, duration],
        )?;
        Ok(VideoId(self.conn.last_insert_rowid()))
    }

    /// Fetch a video's metadata.
    pub fn get_video(&self, id: VideoId) -> StoreResult<Option<VideoRecord>> {
        self.conn
            .query_row(
                "SELECT id, filename, frame_rate, duration FROM videos WHERE id = ?1",
                params![id.as_i64()],
                |row| {
                    Ok(VideoRecord {
                        id: VideoId(row.get(0)?),
                        filename: row.get(1)?,
                        frame_rate: row.get(2)?,
                        duration: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// Delete a video and, by cascade, its detections and ROIs.
    pub fn delete_video(&mut self, id: VideoId) -> StoreResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM videos WHERE id = ?1", params![id.as_i64()])?;
        Ok(deleted > 0)
    }

    /// Persist one pipeline run's detections in a single transaction.
    ///
    /// The rows become visible together when this commits; the pipeline
    /// calls it once, after the frame loop.
    pub fn insert_detections(
        &mut self,
        video_id: VideoId,
        rows: &[NewDetection],
    ) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO detections (video_id, track_id, timestamp, x1, y1, x2, y2)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for row in rows {
                stmt.execute(params![
                    video_id.as_i64(),
                    row.track_id,
                    row.timestamp,
                    row.bbox.x1,
                    row.bbox.y1,
                    row.bbox.x2,
                    row.bbox.y2,
                ])?;
            }
        }
        tx.commit()?;

        debug!(video_id = %video_id, rows = rows.len(), "committed detections");
        Ok(rows.len())
    }

    /// List a video's detections, optionally scoped to one ROI, ordered
    /// by timestamp.
    pub fn list_detections(
        &self,
        video_id: VideoId,
        roi_id: Option<RoiId>,
    ) -> StoreResult<Vec<DetectionRecord>> {
        let mut sql = String::from(
            "SELECT id, video_id, roi_id, track_id, timestamp, x1, y1, x2, y2
             FROM detections WHERE video_id = ?1",
        );
        if roi_id.is_some() {
            sql.push_str(" AND roi_id = ?2");
        }
        sql.push_str(" ORDER BY timestamp, id");

        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(DetectionRecord {
                id: DetectionId(row.get(0)?),
                video_id: VideoId(row.get(1)?),
                roi_id: row.get::<_, Option<i64>>(2)?.map(RoiId),
                track_id: row.get(3)?,
                timestamp: row.get(4)?,
                bbox: BoundingBox::new(row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?),
            })
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match roi_id {
            Some(roi) => stmt.query_map(params![video_id.as_i64(), roi.as_i64()], map_row)?,
            None => stmt.query_map(params![video_id.as_i64()], map_row)?,
        };

        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    /// Persist a region of interest.
    pub fn insert_roi(
        &mut self,
        video_id: VideoId,
        name: &str,
        polygon: &Polygon,
    ) -> StoreResult<RoiId> {
        let points = serde_json::to_string(polygon)?;
        self.conn.execute(
            "INSERT INTO rois (video_id, name, points) VALUES (?1, ?2, ?3)",
            params![video_id.as_i64(), name, points],
        )?;
        Ok(RoiId(self.conn.last_insert_rowid()))
    }

    /// List a video's regions of interest.
    pub fn list_rois(&self, video_id: VideoId) -> StoreResult<Vec<RoiRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, video_id, name, points FROM rois WHERE video_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![video_id.as_i64()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, video_id, name, points) = row?;
            out.push(RoiRecord {
                id: RoiId(id),
                video_id: VideoId(video_id),
                name,
                polygon: serde_json::from_str(&points)?,
            });
        }
        Ok(out)
    }

    /// Back-fill the ROI id onto matching detections, in one transaction.
    pub fn assign_roi(&mut self, roi_id: RoiId, detections: &[DetectionId]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare("UPDATE detections SET roi_id = ?1 WHERE id = ?2")?;
            for det in detections {
                updated += stmt.execute(params![roi_id.as_i64(), det.as_i64()])?;
            }
        }
        tx.commit()?;

        debug!(roi_id = %roi_id, updated, "assigned detections to ROI");
        Ok(updated)
    }

    /// Record an audit event.
    pub fn record_audit_event(
        &mut self,
        event: AuditEvent,
        video_id: Option<VideoId>,
        roi_id: Option<RoiId>,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO audit_log (event, video_id, roi_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                event.as_str(),
                video_id.map(|v| v.as_i64()),
                roi_id.map(|r| r.as_i64()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List audit events, optionally scoped to one video.
    pub fn list_audit_events(&self, video_id: Option<VideoId>) -> StoreResult<Vec<AuditRecord>> {
        let mut sql =
            String::from("SELECT id, event, video_id, roi_id, created_at FROM audit_log");
        if video_id.is_some() {
            sql.push_str(" WHERE video_id = ?1");
        }
        sql.push_str(" ORDER BY id");

        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
            ))
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match video_id {
            Some(video) => stmt.query_map(params![video.as_i64()], map_row)?,
            None => stmt.query_map([], map_row)?,
        };

        let mut out = Vec::new();
        for row in rows {
            let (id, event, video_id, roi_id, created_at) = row?;
            out.push(AuditRecord {
                id,
                event,
                video_id: video_id.map(VideoId),
                roi_id: roi_id.map(RoiId),
                created_at: created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DetectionStore {
        DetectionStore::open_in_memory().unwrap()
    }

    fn new_detection(track_id: i64, timestamp: f64) -> NewDetection {
        NewDetection {
            track_id,
            timestamp,
            bbox: BoundingBox::new(10.0, 10.0, 50.0, 90.0),
        }
    }

    #[test]
    fn test_video_round_trip() {
        let mut store = store();
        let id = store.insert_video("walk.mp4", 30.0, 10.0).unwrap();

        let video = store.get_video(id).unwrap().unwrap();
        assert_eq!(video.filename, "walk.mp4");
        assert_eq!(video.frame_rate, 30.0);
        assert_eq!(video.duration, 10.0);

        assert!(store.get_video(VideoId(999)).unwrap().is_none());
    }

    #[test]
    fn test_detections_commit_together_and_list_ordered() {
        let mut store = store();
        let video = store.insert_video("walk.mp4", 10.0, 2.0).unwrap();

        let rows = vec![
            new_detection(1, 0.2),
            new_detection(2, 0.0),
            new_detection(1, 0.1),
        ];
        assert_eq!(store.insert_detections(video, &rows).unwrap(), 3);

        let listed = store.list_detections(video, None).unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(listed.iter().all(|d| d.roi_id.is_none()));
        assert!(listed.iter().all(|d| d.video_id == video));
    }

    #[test]
    fn test_roi_assignment_and_filtered_listing() {
        let mut store = store();
        let video = store.insert_video("walk.mp4", 10.0, 2.0).unwrap();
        store
            .insert_detections(video, &[new_detection(1, 0.0), new_detection(2, 0.5)])
            .unwrap();

        let polygon =
            Polygon::new(vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)]).unwrap();
        let roi = store.insert_roi(video, "entrance", &polygon).unwrap();

        let all = store.list_detections(video, None).unwrap();
        let first = all[0].id;
        assert_eq!(store.assign_roi(roi, &[first]).unwrap(), 1);

        let scoped = store.list_detections(video, Some(roi)).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, first);
        assert_eq!(scoped[0].roi_id, Some(roi));

        let rois = store.list_rois(video).unwrap();
        assert_eq!(rois.len(), 1);
        assert_eq!(rois[0].name, "entrance");
        assert_eq!(rois[0].polygon, polygon);
    }

    #[test]
    fn test_video_delete_cascades() {
        let mut store = store();
        let video = store.insert_video("walk.mp4", 10.0, 2.0).unwrap();
        store
            .insert_detections(video, &[new_detection(1, 0.0)])
            .unwrap();
        let polygon = Polygon::new(vec![(0.0, 0.0), (10.0, 0.0), (5.0, 10.0)]).unwrap();
        store.insert_roi(video, "zone", &polygon).unwrap();

        assert!(store.delete_video(video).unwrap());
        assert!(store.get_video(video).unwrap().is_none());
        assert!(store.list_detections(video, None).unwrap().is_empty());
        assert!(store.list_rois(video).unwrap().is_empty());
        assert!(!store.delete_video(video).unwrap());
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("vantage.db");

        let video = {
            let mut store = DetectionStore::open(&db_path).unwrap();
            let video = store.insert_video("walk.mp4", 30.0, 10.0).unwrap();
            store
                .insert_detections(video, &[new_detection(1, 0.0)])
                .unwrap();
            video
        };

        // Schema migration is idempotent; data survives the reopen.
        let store = DetectionStore::open(&db_path).unwrap();
        assert!(store.get_video(video).unwrap().is_some());
        assert_eq!(store.list_detections(video, None).unwrap().len(), 1);
    }

    #[test]
    fn test_audit_events() {
        let mut store = store();
        let video = store.insert_video("walk.mp4", 10.0, 2.0).unwrap();

        store
            .record_audit_event(AuditEvent::UploadAccepted, None, None)
            .unwrap();
        store
            .record_audit_event(AuditEvent::VideoProcessed, Some(video), None)
            .unwrap();

        let all = store.list_audit_events(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event, "upload_accepted");

        let scoped = store.list_audit_events(Some(video)).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].event, "video_processed");
        assert_eq!(scoped[0].video_id, Some(video));
    }
}
