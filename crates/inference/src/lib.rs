pub mod backend;
pub mod config;
pub mod detection;
pub mod detector;
pub mod labels;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{ExecutionProvider, InferenceBackend, InferenceOutput};
pub use config::DetectorConfig;
pub use detection::{BoundingBox, Detection, names_above_threshold};
pub use detector::{Detector, ObjectDetector};
pub use labels::Labels;
