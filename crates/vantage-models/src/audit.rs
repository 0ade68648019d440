//! Audit event models.
//!
//! The pipeline signals lifecycle events to the audit log; the delivery
//! surface that lists them belongs to the API layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roi::RoiId;
use crate::video::VideoId;

/// Lifecycle events recorded by the pipeline and ROI assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    /// An upload was accepted and a job created
    UploadAccepted,
    /// A video finished processing successfully
    VideoProcessed,
    /// A video's processing failed
    VideoProcessingFailed,
    /// A region of interest was created and back-filled
    RoiCreated,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::UploadAccepted => "upload_accepted",
            AuditEvent::VideoProcessed => "video_processed",
            AuditEvent::VideoProcessingFailed => "video_processing_failed",
            AuditEvent::RoiCreated => "roi_created",
        }
    }
}

/// A persisted audit log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub event: String,
    pub video_id: Option<VideoId>,
    pub roi_id: Option<RoiId>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(AuditEvent::UploadAccepted.as_str(), "upload_accepted");
        assert_eq!(AuditEvent::VideoProcessed.as_str(), "video_processed");
        assert_eq!(
            AuditEvent::VideoProcessingFailed.as_str(),
            "video_processing_failed"
        );
        assert_eq!(AuditEvent::RoiCreated.as_str(), "roi_created");
    }
}
