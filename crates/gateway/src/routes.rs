use crate::{
    error::DetectError,
    state::AppState,
    upload::{decode_image, dump_upload, read_image_field},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    routing::{get, post},
};
use inference::names_above_threshold;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const HEALTH_MESSAGE: &str = "Food Detection API is running!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub foods: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.settings.max_upload_bytes;

    Router::new()
        .route("/", get(health))
        .route("/detect", post(detect))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}

#[tracing::instrument(skip_all)]
pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, DetectError> {
    let start = Instant::now();
    let outcome = run_detection(&state, multipart).await;
    state.metrics.record(&outcome, start.elapsed());

    let foods = outcome?;
    tracing::info!(foods = ?foods, "Detected foods");
    Ok(Json(DetectionResponse { foods }))
}

async fn run_detection(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<String>, DetectError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "Request is not a multipart upload");
        DetectError::MissingUpload
    })?;

    let bytes = read_image_field(&mut multipart).await?;

    if let Some(path) = &state.settings.debug_upload_path {
        dump_upload(path, &bytes).await;
    }

    // Decoding and inference are CPU bound
    let detector = state.detector.clone();
    let detections = tokio::task::spawn_blocking(move || {
        let image = decode_image(&bytes)?;
        detector
            .detect(&image)
            .map_err(|e| DetectError::Inference(format!("{:#}", e)))
    })
    .await
    .map_err(|e| DetectError::Inference(e.to_string()))??;

    tracing::debug!(raw = detections.len(), "Filtering detections");

    Ok(names_above_threshold(
        &detections,
        state.settings.confidence_threshold,
    ))
}
