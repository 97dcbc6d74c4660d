use super::TransformParams;
use crate::detection::BoundingBox;
use common::span_debug;

/// Number of leading values per YOLOv5 row before the class scores:
/// cx, cy, w, h, objectness.
const BOX_FIELDS: usize = 5;

/// A decoded model output row, before class names are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode YOLOv5 output `[1, N, 5 + num_classes]` into predictions in
    /// original image coordinates, sorted by descending confidence.
    #[tracing::instrument(skip(self, predictions, transform))]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Prediction>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[2] <= BOX_FIELDS {
            anyhow::bail!(
                "Unexpected model output shape {:?}, expected [1, N, 5 + num_classes]",
                shape
            );
        }

        let num_rows = shape[1];
        let num_classes = shape[2] - BOX_FIELDS;

        let mut candidates = Vec::new();

        for i in 0..num_rows {
            let objectness = predictions[[0, i, 4]];
            if objectness <= self.confidence_threshold {
                continue;
            }

            // Argmax over class scores
            let mut best_score = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, i, BOX_FIELDS + c]];
                if score > best_score {
                    best_score = score;
                    class_id = c;
                }
            }

            let confidence = objectness * best_score;
            if confidence <= self.confidence_threshold {
                continue;
            }

            // Box in network-input pixels, cxcywh format
            let cx = predictions[[0, i, 0]];
            let cy = predictions[[0, i, 1]];
            let w = predictions[[0, i, 2]];
            let h = predictions[[0, i, 3]];
            let (x1, y1, x2, y2) = cxcywh_to_xyxy(cx, cy, w, h);

            candidates.push(Prediction {
                class_id,
                confidence,
                bbox: BoundingBox { x1, y1, x2, y2 },
            });
        }

        let mut kept = self.non_maximum_suppression(candidates);

        for prediction in &mut kept {
            prediction.bbox = to_original_coordinates(prediction.bbox, transform);
        }

        Ok(kept)
    }

    /// Greedy per-class NMS. Stable sort keeps model order among equal
    /// confidences.
    fn non_maximum_suppression(&self, mut candidates: Vec<Prediction>) -> Vec<Prediction> {
        let _s = span_debug!("non_maximum_suppression");

        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut kept: Vec<Prediction> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.max_detections {
                break;
            }
            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > self.iou_threshold
            });
            if !suppressed {
                kept.push(candidate);
            }
        }

        tracing::debug!(kept = kept.len(), "NMS complete");
        kept
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = inter_w * inter_h;
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Apply inverse letterbox transform, clamped to the original image
fn to_original_coordinates(bbox: BoundingBox, transform: &TransformParams) -> BoundingBox {
    let width = transform.orig_width as f32;
    let height = transform.orig_height as f32;
    BoundingBox {
        x1: ((bbox.x1 - transform.offset_x) / transform.scale).clamp(0.0, width),
        y1: ((bbox.y1 - transform.offset_y) / transform.scale).clamp(0.0, height),
        x2: ((bbox.x2 - transform.offset_x) / transform.scale).clamp(0.0, width),
        y2: ((bbox.y2 - transform.offset_y) / transform.scale).clamp(0.0, height),
    }
}
