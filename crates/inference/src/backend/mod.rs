use ndarray::{Array, IxDyn};
use serde::Deserialize;

#[cfg(feature = "ort-backend")]
pub mod ort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

/// A loaded detection network.
///
/// `infer` takes `&mut self` because ONNX Runtime sessions need exclusive
/// access while running; callers sharing a backend across threads wrap it
/// in a mutex.
pub trait InferenceBackend: Send {
    fn load_model(
        path: &str,
        provider: ExecutionProvider,
        intra_threads: usize,
    ) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a `[1, 3, H, W]` normalized input
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Raw class-name table shipped inside the model file, if any. YOLOv5
    /// exports store it as a Python dict literal under the `names` key.
    fn class_names(&self) -> Option<&str> {
        None
    }
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, N, 5 + num_classes] cxcywh, objectness, class scores
}
