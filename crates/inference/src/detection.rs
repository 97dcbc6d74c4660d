use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub name: String,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Names of detections scoring strictly above `threshold`, in input order.
/// Repeated classes are kept.
pub fn names_above_threshold(detections: &[Detection], threshold: f32) -> Vec<String> {
    detections
        .iter()
        .filter(|d| d.confidence > threshold)
        .map(|d| d.name.clone())
        .collect()
}
