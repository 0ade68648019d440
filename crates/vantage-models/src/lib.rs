//! Shared data models for the Vantage analytics backend.
//!
//! This crate provides Serde-serializable types for:
//! - Videos, detections and bounding boxes
//! - Regions of interest and polygon geometry
//! - Jobs and job status snapshots
//! - Analytics summaries
//! - Audit events

pub mod analytics;
pub mod audit;
pub mod detection;
pub mod job;
pub mod roi;
pub mod video;

// Re-export common types
pub use analytics::AnalyticsSummary;
pub use audit::{AuditEvent, AuditRecord};
pub use detection::{
    BoundingBox, DetectionId, DetectionRecord, NewDetection, Observation, PERSON_CLASS_ID,
};
pub use job::{JobId, JobRecord, JobStatus, JobStatusSnapshot};
pub use roi::{Polygon, PolygonError, RoiId, RoiRecord};
pub use video::{VideoId, VideoRecord};
