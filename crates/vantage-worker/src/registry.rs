//! In-memory job registry.
//!
//! Shared mutable state between each job's single writer and concurrent
//! status readers. An explicit object owned by the orchestrator, not a
//! process-wide singleton, so tests and embedders get clean isolation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use vantage_models::{JobId, JobRecord, JobStatusSnapshot};

/// Concurrency-safe job id -> record mapping.
///
/// Entries are never evicted; jobs stay queryable for the process
/// lifetime, including failed ones.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    inner: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job record.
    pub fn insert(&self, record: JobRecord) {
        let mut jobs = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(record.job_id.clone(), record);
    }

    /// Mutate one job's record in place.
    ///
    /// Returns false when the job is unknown.
    pub fn update(&self, job_id: &JobId, f: impl FnOnce(&mut JobRecord)) -> bool {
        let mut jobs = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(job_id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Status snapshot for one job.
    pub fn snapshot(&self, job_id: &JobId) -> Option<JobStatusSnapshot> {
        let jobs = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(job_id).map(JobRecord::snapshot)
    }

    /// Status snapshots for every known job.
    pub fn list(&self) -> Vec<JobStatusSnapshot> {
        let jobs = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        jobs.values().map(JobRecord::snapshot).collect()
    }

    /// Number of known jobs.
    pub fn len(&self) -> usize {
        let jobs = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        jobs.len()
    }

    /// Whether the registry has no jobs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vantage_models::{JobStatus, VideoId};

    #[test]
    fn test_insert_and_snapshot() {
        let registry = JobRegistry::new();
        let job_id = JobId::new();
        registry.insert(JobRecord::new(job_id.clone(), PathBuf::from("/tmp/a.mp4")));

        let snap = registry.snapshot(&job_id).unwrap();
        assert_eq!(snap.status, JobStatus::Queued);
        assert!(registry.snapshot(&JobId::new()).is_none());
    }

    #[test]
    fn test_update_reflects_in_snapshots() {
        let registry = JobRegistry::new();
        let job_id = JobId::new();
        registry.insert(JobRecord::new(job_id.clone(), PathBuf::from("/tmp/a.mp4")));

        assert!(registry.update(&job_id, |job| job.complete(VideoId(3))));
        let snap = registry.snapshot(&job_id).unwrap();
        assert_eq!(snap.status, JobStatus::Done);
        assert_eq!(snap.video_id, Some(VideoId(3)));

        assert!(!registry.update(&JobId::new(), |job| job.start()));
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = JobRegistry::new();
        let b = JobRegistry::new();
        a.insert(JobRecord::new(JobId::new(), PathBuf::from("/tmp/a.mp4")));

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
