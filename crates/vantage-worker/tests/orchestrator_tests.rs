//! Job lifecycle integration tests.
//!
//! These drive the orchestrator with unusable inputs, so they exercise
//! the full queued -> processing -> failed path without needing a
//! detection model on disk.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use vantage_models::{JobId, JobStatus, JobStatusSnapshot};
use vantage_worker::{JobOrchestrator, WorkerConfig, WorkerError};

fn test_config(dir: &tempfile::TempDir) -> WorkerConfig {
    WorkerConfig {
        model_path: dir.path().join("missing.onnx").to_string_lossy().into_owned(),
        output_dir: dir.path().join("outputs"),
        db_path: dir.path().join("vantage.db"),
        max_concurrent_jobs: 0,
    }
}

fn write_corrupt_video(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, b"this is not a video container").unwrap();
    path
}

async fn wait_terminal(orchestrator: &JobOrchestrator, job_id: &JobId) -> JobStatusSnapshot {
    for _ in 0..600 {
        if let Some(snap) = orchestrator.status(job_id) {
            if snap.status.is_terminal() {
                return snap;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

#[tokio::test]
async fn corrupt_upload_fails_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = JobOrchestrator::new(test_config(&dir));
    let path = write_corrupt_video(&dir, "corrupt.mp4");

    let job_id = orchestrator.submit(path).unwrap();

    // Immediately queryable, never stuck at processing.
    assert!(orchestrator.status(&job_id).is_some());

    let snap = wait_terminal(&orchestrator, &job_id).await;
    assert_eq!(snap.status, JobStatus::Failed);
    assert!(snap.error.is_some());
    assert!(snap.video_id.is_none());
}

#[tokio::test]
async fn unsupported_extension_rejected_before_job_creation() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = JobOrchestrator::new(test_config(&dir));
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"hello").unwrap();

    let err = orchestrator.submit(path).unwrap_err();
    assert!(matches!(err, WorkerError::UnsupportedFormat(_)));
    assert!(orchestrator.registry().is_empty());
}

#[tokio::test]
async fn extension_check_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = JobOrchestrator::new(test_config(&dir));
    let path = write_corrupt_video(&dir, "CLIP.MP4");

    assert!(orchestrator.submit(path).is_ok());
    assert_eq!(orchestrator.jobs().len(), 1);
}

#[tokio::test]
async fn concurrent_jobs_fail_independently() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = JobOrchestrator::new(test_config(&dir));

    let mut jobs = Vec::new();
    for i in 0..5 {
        let path = write_corrupt_video(&dir, &format!("upload-{}.mp4", i));
        jobs.push((orchestrator.submit(&path).unwrap(), path));
    }

    for (job_id, path) in &jobs {
        let snap = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(snap.status, JobStatus::Failed);
        assert!(snap.video_id.is_none());

        // Each record carries its own failure; nothing leaks across jobs.
        let error = snap.error.expect("failed jobs carry an error");
        assert!(
            error.contains(&*path.to_string_lossy()),
            "error {:?} should mention {:?}",
            error,
            path
        );
    }

    assert_eq!(orchestrator.jobs().len(), 5);
}

#[tokio::test]
async fn bounded_orchestrator_still_completes_all_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.max_concurrent_jobs = 1;
    let orchestrator = JobOrchestrator::new(config);

    let mut jobs = Vec::new();
    for i in 0..3 {
        let path = write_corrupt_video(&dir, &format!("queued-{}.mp4", i));
        jobs.push(orchestrator.submit(path).unwrap());
    }

    for job_id in &jobs {
        let snap = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(snap.status, JobStatus::Failed);
    }
}
