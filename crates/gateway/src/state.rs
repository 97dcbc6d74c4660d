use crate::metrics::DetectMetrics;
use inference::ObjectDetector;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-request knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct DetectSettings {
    pub confidence_threshold: f32,
    pub max_upload_bytes: usize,
    pub debug_upload_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn ObjectDetector>,
    pub settings: Arc<DetectSettings>,
    pub metrics: DetectMetrics,
}

impl AppState {
    pub fn new(detector: Arc<dyn ObjectDetector>, settings: DetectSettings) -> Self {
        Self {
            detector,
            settings: Arc::new(settings),
            metrics: DetectMetrics::new("gateway"),
        }
    }
}
