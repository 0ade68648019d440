//! Worker configuration.

use std::path::PathBuf;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Path to the YOLOv8 ONNX model
    pub model_path: String,
    /// Directory for annotated videos and heatmap images
    pub output_dir: PathBuf,
    /// SQLite database path
    pub db_path: PathBuf,
    /// Maximum concurrent jobs; 0 means unbounded
    pub max_concurrent_jobs: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            output_dir: PathBuf::from("outputs"),
            db_path: PathBuf::from("vantage.db"),
            max_concurrent_jobs: 0,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            model_path: std::env::var("VANTAGE_MODEL_PATH")
                .unwrap_or_else(|_| "models/yolov8n.onnx".to_string()),
            output_dir: std::env::var("VANTAGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("outputs")),
            db_path: std::env::var("VANTAGE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("vantage.db")),
            max_concurrent_jobs: std::env::var("VANTAGE_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}
