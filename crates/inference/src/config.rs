use crate::backend::ExecutionProvider;
use serde::Deserialize;

pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Model-side settings. Everything the detector needs to go from an ONNX
/// file on disk to a list of detections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: String,
    /// Text file with one class name per line. Without it detections are
    /// named `class_<id>`.
    pub labels_path: Option<String>,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    /// Square network input, in pixels.
    pub input_size: u32,
    /// Candidate threshold applied before NMS (YOLOv5 `conf_thres`).
    pub nms_confidence: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl DetectorConfig {
    pub fn input_dims(&self) -> (u32, u32) {
        (self.input_size, self.input_size)
    }

    /// Reject settings that would only fail once requests arrive.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input_size == 0 {
            anyhow::bail!("detector.input_size must be greater than zero");
        }
        for (key, value) in [
            ("nms_confidence", self.nms_confidence),
            ("iou_threshold", self.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("detector.{} must be within [0, 1], got {}", key, value);
            }
        }
        if self.max_detections == 0 {
            anyhow::bail!("detector.max_detections must be greater than zero");
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "runs/best.onnx".to_string(),
            labels_path: None,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 4,
            input_size: DEFAULT_INPUT_SIZE.0,
            nms_confidence: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
        }
    }
}
