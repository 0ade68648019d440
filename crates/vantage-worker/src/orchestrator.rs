//! Job orchestration.
//!
//! Every accepted upload becomes one job running on its own execution
//! context with its own store session. The orchestrator only ever
//! observes jobs through the registry; a crashing job records its
//! failure and never disturbs its siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use vantage_media::DetectorConfig;
use vantage_models::{AuditEvent, JobId, JobRecord, JobStatusSnapshot, VideoId};
use vantage_store::DetectionStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::pipeline;
use crate::registry::JobRegistry;

/// Container extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi"];

/// Launches and tracks one pipeline run per upload.
pub struct JobOrchestrator {
    config: Arc<WorkerConfig>,
    registry: JobRegistry,
    limiter: Option<Arc<Semaphore>>,
}

impl JobOrchestrator {
    /// Create an orchestrator owning a fresh registry.
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_registry(config, JobRegistry::new())
    }

    /// Create an orchestrator over an injected registry.
    pub fn with_registry(config: WorkerConfig, registry: JobRegistry) -> Self {
        let limiter = if config.max_concurrent_jobs > 0 {
            Some(Arc::new(Semaphore::new(config.max_concurrent_jobs)))
        } else {
            None
        };
        Self {
            config: Arc::new(config),
            registry,
            limiter,
        }
    }

    /// The job registry backing this orchestrator.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Accept an uploaded file and launch its analysis job.
    ///
    /// Rejects files whose extension is not allow-listed before any job
    /// is created. The returned id is immediately queryable.
    pub fn submit(&self, video_path: impl Into<PathBuf>) -> WorkerResult<JobId> {
        let video_path = video_path.into();
        let ext = video_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(WorkerError::UnsupportedFormat(ext));
        }

        let job_id = JobId::new();
        self.registry
            .insert(JobRecord::new(job_id.clone(), video_path.clone()));
        info!(job_id = %job_id, path = %video_path.display(), "upload accepted");

        let registry = self.registry.clone();
        let config = Arc::clone(&self.config);
        let limiter = self.limiter.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            // With a configured bound, the job stays queued until a
            // permit frees up; by default concurrency is unbounded.
            let _permit = match &limiter {
                Some(sem) => sem.clone().acquire_owned().await.ok(),
                None => None,
            };
            run_job(id, video_path, config, registry).await;
        });

        Ok(job_id)
    }

    /// Current status snapshot for one job.
    pub fn status(&self, job_id: &JobId) -> Option<JobStatusSnapshot> {
        self.registry.snapshot(job_id)
    }

    /// Status snapshots for every submitted job.
    pub fn jobs(&self) -> Vec<JobStatusSnapshot> {
        self.registry.list()
    }
}

/// Drive one job from queued to a terminal state.
async fn run_job(
    job_id: JobId,
    video_path: PathBuf,
    config: Arc<WorkerConfig>,
    registry: JobRegistry,
) {
    registry.update(&job_id, JobRecord::start);
    info!(job_id = %job_id, "job started");

    let output_path = config.output_dir.join(format!("{}.mp4", job_id));
    let worker_config = Arc::clone(&config);
    let result =
        tokio::task::spawn_blocking(move || execute(&video_path, &output_path, &worker_config))
            .await;

    match result {
        Ok(Ok(video_id)) => {
            registry.update(&job_id, |job| job.complete(video_id));
            info!(job_id = %job_id, video_id = %video_id, "job finished");
        }
        Ok(Err(e)) => {
            let message = e.to_string();
            registry.update(&job_id, |job| job.fail(message.as_str()));
            error!(job_id = %job_id, error = %message, "job failed");
        }
        Err(e) => {
            // The pipeline panicked; contain it to this job.
            let message = format!("job aborted: {}", e);
            registry.update(&job_id, |job| job.fail(message.as_str()));
            error!(job_id = %job_id, error = %message, "job aborted");
        }
    }
}

/// The blocking body of one job: own store session, audit notifications,
/// pipeline run.
fn execute(video_path: &Path, output_path: &Path, config: &WorkerConfig) -> WorkerResult<VideoId> {
    std::fs::create_dir_all(&config.output_dir)?;

    let mut store = DetectionStore::open(&config.db_path)?;
    store.record_audit_event(AuditEvent::UploadAccepted, None, None)?;

    let detector_config = DetectorConfig {
        model_path: config.model_path.clone(),
        ..Default::default()
    };

    match pipeline::process_video(video_path, output_path, &mut store, detector_config) {
        Ok(video_id) => {
            store.record_audit_event(AuditEvent::VideoProcessed, Some(video_id), None)?;
            Ok(video_id)
        }
        Err(e) => {
            // The failure itself is what gets reported; a secondary audit
            // write error must not mask it.
            if let Err(audit_err) =
                store.record_audit_event(AuditEvent::VideoProcessingFailed, None, None)
            {
                error!(error = %audit_err, "failed to record audit event");
            }
            Err(e)
        }
    }
}
