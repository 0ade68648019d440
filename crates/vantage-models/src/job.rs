//! Job lifecycle models.
//!
//! Jobs live only in the orchestrator's in-memory registry; they are not
//! persisted. One worker mutates a job's record while status queries read
//! it concurrently.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::video::VideoId;

/// Opaque identifier for a processing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted, waiting for its worker to start
    #[default]
    Queued,
    /// Job is actively being processed
    Processing,
    /// Processing completed successfully
    Done,
    /// Processing failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// In-memory record for one submitted upload.
///
/// Invariants: `video_id` is set iff status is `Done`; `error` is set iff
/// status is `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Opaque job token
    pub job_id: JobId,
    /// Path of the uploaded source file
    pub video_path: PathBuf,
    /// Resulting video id, set on completion
    pub video_id: Option<VideoId>,
    /// Current status
    pub status: JobStatus,
    /// Error message, set on failure
    pub error: Option<String>,
    /// When the upload was accepted
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a queued record for an accepted upload.
    pub fn new(job_id: JobId, video_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            video_path,
            video_id: None,
            status: JobStatus::Queued,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the job as processing.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    /// Mark the job as done with its resulting video.
    pub fn complete(&mut self, video_id: VideoId) {
        self.status = JobStatus::Done;
        self.video_id = Some(video_id);
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed with a human-readable message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Snapshot for a status query.
    pub fn snapshot(&self) -> JobStatusSnapshot {
        JobStatusSnapshot {
            job_id: self.job_id.clone(),
            status: self.status,
            video_id: self.video_id,
            error: self.error.clone(),
        }
    }
}

/// Status-query response shape.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub video_id: Option<VideoId>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generation() {
        let id1 = JobId::new();
        let id2 = JobId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_job_record_transitions() {
        let mut job = JobRecord::new(JobId::new(), PathBuf::from("/tmp/in.mp4"));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(!job.status.is_terminal());

        job.start();
        assert_eq!(job.status, JobStatus::Processing);

        job.complete(VideoId(7));
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.video_id, Some(VideoId(7)));
        assert!(job.error.is_none());
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_job_record_failure() {
        let mut job = JobRecord::new(JobId::new(), PathBuf::from("/tmp/in.mp4"));
        job.start();
        job.fail("could not open video");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("could not open video"));
        assert!(job.video_id.is_none());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut job = JobRecord::new(JobId::from_string("j-1"), PathBuf::from("/tmp/in.mp4"));
        job.fail("boom");

        let snap = job.snapshot();
        assert_eq!(snap.job_id.as_str(), "j-1");
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.video_id, None);
        assert_eq!(snap.error.as_deref(), Some("boom"));
    }
}
