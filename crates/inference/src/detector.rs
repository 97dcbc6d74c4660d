use crate::{
    backend::{InferenceBackend, InferenceOutput},
    config::DetectorConfig,
    detection::Detection,
    labels::Labels,
    processing::{post::PostProcessor, pre::PreProcessor},
};
use anyhow::Context;
use image::DynamicImage;
use std::sync::Mutex;

/// Anything that can turn a decoded image into detections.
///
/// The HTTP layer depends on this trait rather than on a concrete backend
/// so handlers can be exercised with a stub.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>>;
}

pub struct Detector<B: InferenceBackend> {
    backend: Mutex<B>,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
    labels: Labels,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, labels: Labels, config: &DetectorConfig) -> Self {
        Self {
            backend: Mutex::new(backend),
            preprocessor: PreProcessor::new(config.input_dims()),
            postprocessor: PostProcessor::new(
                config.nms_confidence,
                config.iou_threshold,
                config.max_detections,
            ),
            labels,
        }
    }

    /// Load labels and model. Called once at startup, never retried.
    ///
    /// Class names come from `labels_path` when configured, otherwise from
    /// the table embedded in the model.
    pub fn load(config: &DetectorConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let file_labels = config
            .labels_path
            .as_ref()
            .map(Labels::from_file)
            .transpose()?;

        let backend = B::load_model(
            &config.model_path,
            config.execution_provider,
            config.intra_threads,
        )?;

        let labels = match (file_labels, backend.class_names()) {
            (Some(labels), _) => labels,
            (None, Some(raw)) => Labels::from_model_metadata(raw)
                .context("failed to read class names embedded in the model")?,
            (None, None) => {
                tracing::warn!(
                    "No labels file configured and the model carries no class names, \
                     detections will be named by class id"
                );
                Labels::default()
            }
        };

        Ok(Self::new(backend, labels, config))
    }
}

impl<B: InferenceBackend> ObjectDetector for Detector<B> {
    #[tracing::instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        let (input, transform) = self.preprocessor.preprocess(image.to_rgb8())?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow::anyhow!("Inference backend lock poisoned"))?;
            backend.infer(&input)?
        };

        let predictions = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;

        let detections: Vec<Detection> = predictions
            .into_iter()
            .map(|p| Detection {
                name: self.labels.name(p.class_id),
                class_id: p.class_id,
                confidence: p.confidence,
                bbox: p.bbox,
            })
            .collect();

        tracing::debug!(count = detections.len(), "Raw detections");
        Ok(detections)
    }
}
