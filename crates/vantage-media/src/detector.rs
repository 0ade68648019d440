//! Person detection using a YOLOv8 ONNX model.
//!
//! Runs ONNX Runtime inference with automatic execution provider
//! selection: CUDA on Linux with an NVIDIA GPU (when the `cuda` feature is
//! enabled), CPU everywhere else.

use std::path::Path;
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use vantage_models::BoundingBox;

use crate::error::{MediaError, MediaResult};

/// COCO class names (80 classes). Index 0 is "person".
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// One raw detector output, before tracking.
#[derive(Debug, Clone, Copy)]
pub struct RawDetection {
    /// Bounding box in source pixel coordinates
    pub bbox: BoundingBox,
    /// COCO class id (0 = person)
    pub class_id: usize,
    /// Detection confidence [0, 1]
    pub confidence: f32,
}

/// Configuration for the person detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Confidence threshold for detections
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (the model expects square input)
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLOv8 detector over single frames.
pub struct PersonDetector {
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl PersonDetector {
    /// Load the model once; reused for every frame of a pipeline run.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "person detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Detect objects in one frame.
    ///
    /// Returns pixel-space corner boxes for every class above the
    /// confidence threshold, NMS-filtered per class.
    pub fn detect(&self, img: &DynamicImage) -> MediaResult<Vec<RawDetection>> {
        let (width, height) = img.dimensions();
        let input = self.preprocess(img)?;
        let outputs = self.run_inference(input)?;
        let detections = self.postprocess(&outputs, width, height)?;

        debug!(count = detections.len(), "frame detection completed");
        Ok(detections)
    }

    /// Preprocess: resize to the model input size, normalize to [0, 1],
    /// NCHW layout.
    fn preprocess(&self, img: &DynamicImage) -> MediaResult<Value> {
        let input_size = self.config.input_size;

        let resized = img.resize_exact(
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let rgb = resized.to_rgb8();
        let (w, h) = (input_size as usize, input_size as usize);

        // HWC -> CHW with normalization to [0, 1]
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::internal(format!("failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("inference failed: {}", e)))?;

        // YOLOv8 output is [1, 84, 8400]
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::internal("missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::internal(format!("failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Decode the raw [1, 84, 8400] output into pixel-space boxes.
    ///
    /// 84 = 4 bbox values (cx, cy, w, h) + 80 class scores.
    fn postprocess(
        &self,
        outputs: &[f32],
        orig_width: u32,
        orig_height: u32,
    ) -> MediaResult<Vec<RawDetection>> {
        let num_classes = 80;
        let num_boxes = 8400;
        let num_features = 84;

        if outputs.len() != num_features * num_boxes {
            return Err(MediaError::internal(format!(
                "unexpected output size: expected {}, got {}",
                num_features * num_boxes,
                outputs.len()
            )));
        }

        // Output is [84, 8400]; transpose to iterate candidates.
        let output_array = Array::from_shape_vec((num_features, num_boxes), outputs.to_vec())
            .map_err(|e| MediaError::internal(format!("failed to reshape output: {}", e)))?;
        let transposed = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = orig_width as f32 / input_size;
        let scale_h = orig_height as f32 / input_size;

        let mut candidates: Vec<RawDetection> = Vec::new();

        for i in 0..num_boxes {
            let cx = transposed[[i, 0]];
            let cy = transposed[[i, 1]];
            let w = transposed[[i, 2]];
            let h = transposed[[i, 3]];

            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..num_classes {
                let score = transposed[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_score < self.config.confidence_threshold {
                continue;
            }

            // Center format -> corner format, scaled to source pixels and
            // clamped to the frame.
            let x1 = ((cx - w / 2.0) * scale_w).clamp(0.0, orig_width as f32) as f64;
            let y1 = ((cy - h / 2.0) * scale_h).clamp(0.0, orig_height as f32) as f64;
            let x2 = ((cx + w / 2.0) * scale_w).clamp(0.0, orig_width as f32) as f64;
            let y2 = ((cy + h / 2.0) * scale_h).clamp(0.0, orig_height as f32) as f64;

            let bbox = BoundingBox::new(x1, y1, x2, y2);
            if !bbox.is_valid() {
                continue;
            }

            candidates.push(RawDetection {
                bbox,
                class_id: best_class,
                confidence: best_score,
            });
        }

        Ok(self.non_maximum_suppression(candidates))
    }

    /// Non-Maximum Suppression, per class.
    fn non_maximum_suppression(&self, mut detections: Vec<RawDetection>) -> Vec<RawDetection> {
        if detections.is_empty() {
            return detections;
        }

        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut keep = Vec::new();
        let mut suppressed = vec![false; detections.len()];

        for i in 0..detections.len() {
            if suppressed[i] {
                continue;
            }

            keep.push(detections[i]);

            for j in (i + 1)..detections.len() {
                if suppressed[j] || detections[i].class_id != detections[j].class_id {
                    continue;
                }
                if detections[i].bbox.iou(&detections[j].bbox) > self.config.nms_threshold as f64 {
                    suppressed[j] = true;
                }
            }
        }

        keep
    }

    /// Get the configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

/// Create an ONNX Runtime session with execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("using CUDA execution provider for detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, falling back to CPU");
    }

    info!("using CPU execution provider for detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.input_size, 640);
        assert!((config.confidence_threshold - 0.25).abs() < 0.001);
        assert!((config.nms_threshold - 0.45).abs() < 0.001);
    }

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES[0], "person");
        assert_eq!(COCO_CLASSES.len(), 80);
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let config = DetectorConfig {
            model_path: "/nonexistent/model.onnx".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PersonDetector::new(config),
            Err(MediaError::ModelNotFound(_))
        ));
    }
}
