//! Video analysis worker binary.
//!
//! Submits the files given on the command line to the orchestrator and
//! polls until every job reaches a terminal state, then prints each
//! completed video's analytics summary.

use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vantage_models::JobStatus;
use vantage_store::DetectionStore;
use vantage_worker::{analytics, JobOrchestrator, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vantage=info".parse().expect("valid directive"))
        .add_directive("ort=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vantage-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        error!("no input files; usage: vantage-worker <video>...");
        std::process::exit(2);
    }

    let db_path = config.db_path.clone();
    let orchestrator = JobOrchestrator::new(config);

    let mut submitted = Vec::new();
    for file in files {
        match orchestrator.submit(&*file) {
            Ok(job_id) => {
                info!(job_id = %job_id, file = %file, "job submitted");
                submitted.push(job_id);
            }
            Err(e) => warn!(file = %file, error = %e, "upload rejected"),
        }
    }

    // Poll until every accepted job is terminal.
    loop {
        let pending = submitted
            .iter()
            .filter_map(|id| orchestrator.status(id))
            .filter(|snap| !snap.status.is_terminal())
            .count();
        if pending == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let mut failed = false;
    for job_id in &submitted {
        let Some(snap) = orchestrator.status(job_id) else {
            continue;
        };
        match snap.status {
            JobStatus::Done => {
                let video_id = snap.video_id.expect("done jobs carry a video id");
                let summary = DetectionStore::open(&db_path)
                    .map_err(anyhow::Error::from)
                    .and_then(|store| {
                        analytics::video_analytics(&store, video_id, None)
                            .map_err(anyhow::Error::from)
                    });
                match summary {
                    Ok(summary) => {
                        let json = serde_json::to_string(&summary)
                            .unwrap_or_else(|_| "{}".to_string());
                        info!(job_id = %job_id, video_id = %video_id, summary = %json, "job done");
                    }
                    Err(e) => warn!(job_id = %job_id, error = %e, "analytics query failed"),
                }
            }
            JobStatus::Failed => {
                failed = true;
                error!(
                    job_id = %job_id,
                    error = snap.error.as_deref().unwrap_or("unknown"),
                    "job failed"
                );
            }
            _ => {}
        }
    }

    if failed {
        std::process::exit(1);
    }
}
