use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while serving `/detect`. Each variant maps
/// to a status code and a `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("No image uploaded")]
    MissingUpload,

    #[error("{}", .0.body_text())]
    Upload(#[from] MultipartError),

    #[error("Could not identify image format")]
    UnreadableImage,

    #[error("{0}")]
    ImageDecode(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl DetectError {
    pub fn status(&self) -> StatusCode {
        match self {
            DetectError::Upload(e) => e.status(),
            DetectError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DetectError::MissingUpload
            | DetectError::UnreadableImage
            | DetectError::ImageDecode(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::MissingUpload => "missing_upload",
            DetectError::Upload(_) => "upload",
            DetectError::UnreadableImage => "unreadable_image",
            DetectError::ImageDecode(_) => "image_decode",
            DetectError::Inference(_) => "inference",
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Detection failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Rejected detection request");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
