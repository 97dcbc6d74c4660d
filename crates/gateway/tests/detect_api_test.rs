use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use gateway::{AppState, DetectSettings, DetectionResponse, router};
use image::{DynamicImage, ImageFormat, RgbImage};
use inference::{BoundingBox, Detection, ObjectDetector};
use serde_json::Value;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

const BOUNDARY: &str = "food-detect-test-boundary";

/// What the stub detector does when called
enum Behavior {
    Detections(Vec<(&'static str, f32)>),
    Fail(&'static str),
    Panic,
}

struct StubDetector {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubDetector {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectDetector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Detections(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(class_id, (name, confidence))| Detection {
                    name: name.to_string(),
                    class_id,
                    confidence: *confidence,
                    bbox: BoundingBox {
                        x1: 0.0,
                        y1: 0.0,
                        x2: 4.0,
                        y2: 4.0,
                    },
                })
                .collect()),
            Behavior::Fail(message) => anyhow::bail!("{}", message),
            Behavior::Panic => panic!("inference runtime crashed"),
        }
    }
}

fn settings() -> DetectSettings {
    DetectSettings {
        confidence_threshold: 0.10,
        max_upload_bytes: 1024 * 1024,
        debug_upload_path: None,
    }
}

fn app_with(detector: Arc<StubDetector>, settings: DetectSettings) -> Router {
    router(AppState::new(detector, settings))
}

fn app(detector: Arc<StubDetector>) -> Router {
    app_with(detector, settings())
}

fn png_bytes() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    RgbImage::from_pixel(16, 12, image::Rgb([200, 120, 40]))
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Build a multipart body with a single file field
fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A plain form value, without the `filename` that marks a file upload
fn form_value_body(field: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn image_request(content: &[u8]) -> Request<Body> {
    detect_request(multipart_body("image", "food.jpg", content))
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn foods(response: Response) -> Vec<String> {
    let body: DetectionResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    body.foods
}

#[tokio::test]
async fn test_health_route() {
    let detector = StubDetector::new(Behavior::Detections(vec![]));

    let response = app(detector.clone())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_bytes(response).await,
        b"Food Detection API is running!"
    );
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_single_confident_detection() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.95)]));

    let response = app(detector.clone())
        .oneshot(image_request(&png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({ "foods": ["apple"] }));
    assert_eq!(detector.calls(), 1);
}

/// Threshold is exclusive, order follows the model, duplicates are kept
#[tokio::test]
async fn test_filtering_by_confidence() {
    let detector = StubDetector::new(Behavior::Detections(vec![
        ("rice", 0.95),
        ("egg", 0.10),
        ("carrot", 0.05),
        ("rice", 0.5),
        ("broccoli", 0.11),
    ]));

    let response = app(detector).oneshot(image_request(&png_bytes())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(foods(response).await, vec!["rice", "rice", "broccoli"]);
}

#[tokio::test]
async fn test_configured_threshold_is_used() {
    let detector = StubDetector::new(Behavior::Detections(vec![("rice", 0.6), ("egg", 0.4)]));
    let settings = DetectSettings {
        confidence_threshold: 0.5,
        ..settings()
    };

    let response = app_with(detector, settings)
        .oneshot(image_request(&png_bytes()))
        .await
        .unwrap();

    assert_eq!(foods(response).await, vec!["rice"]);
}

#[tokio::test]
async fn test_no_detections_gives_empty_list() {
    for detections in [vec![], vec![("apple", 0.08), ("pear", 0.10)]] {
        let detector = StubDetector::new(Behavior::Detections(detections));

        let response = app(detector).oneshot(image_request(&png_bytes())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({ "foods": [] }));
    }
}

#[tokio::test]
async fn test_same_image_twice_is_idempotent() {
    let detector = StubDetector::new(Behavior::Detections(vec![
        ("pizza", 0.8),
        ("salad", 0.3),
    ]));
    let app = app(detector.clone());

    let first = foods(app.clone().oneshot(image_request(&png_bytes())).await.unwrap()).await;
    let second = foods(app.oneshot(image_request(&png_bytes())).await.unwrap()).await;

    assert_eq!(first, second);
    assert_eq!(detector.calls(), 2);
}

#[tokio::test]
async fn test_missing_image_field() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));

    let response = app(detector.clone())
        .oneshot(detect_request(multipart_body("photo", "food.png", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "No image uploaded" })
    );
    assert_eq!(detector.calls(), 0, "Model must not be touched");
}

#[tokio::test]
async fn test_image_form_value_without_filename() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));

    let response = app(detector.clone())
        .oneshot(detect_request(form_value_body("image", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "No image uploaded" })
    );
    assert_eq!(detector.calls(), 0, "A form value is not a file upload");
}

#[tokio::test]
async fn test_empty_image_field() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));

    let response = app(detector.clone())
        .oneshot(image_request(b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "No image uploaded" })
    );
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_non_multipart_request() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));

    let request = Request::post("/detect").body(Body::empty()).unwrap();
    let response = app(detector.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "No image uploaded" })
    );
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_text_file_is_rejected() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));

    let response = app(detector.clone())
        .oneshot(image_request(b"grocery list: eggs, milk, bread\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Could not identify image format" })
    );
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_corrupt_image_passes_decoder_message() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));
    let png = png_bytes();

    let response = app(detector.clone())
        .oneshot(image_request(&png[..24]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(!message.is_empty());
    assert_ne!(message, "Could not identify image format");
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_inference_failure_is_a_server_error() {
    let detector = StubDetector::new(Behavior::Fail("malformed output tensor"));

    let response = app(detector).oneshot(image_request(&png_bytes())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Inference failed: malformed output tensor" })
    );
}

#[tokio::test]
async fn test_inference_panic_is_contained() {
    let detector = StubDetector::new(Behavior::Panic);
    let app = app(detector);

    let response = app.clone().oneshot(image_request(&png_bytes())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Inference failed"));

    // Service keeps answering afterwards
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let detector = StubDetector::new(Behavior::Detections(vec![("apple", 0.9)]));
    let settings = DetectSettings {
        max_upload_bytes: 1024,
        ..settings()
    };

    let response = app_with(detector.clone(), settings)
        .oneshot(image_request(&vec![0xAB; 8 * 1024]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert!(body["error"].is_string());
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_debug_dump_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("debug_upload.jpg");
    let png = png_bytes();

    // Disabled by default
    let detector = StubDetector::new(Behavior::Detections(vec![]));
    app(detector).oneshot(image_request(&png)).await.unwrap();
    assert!(!path.exists(), "Nothing is written unless configured");

    // Enabled: raw bytes land on disk, even for undecodable uploads
    let detector = StubDetector::new(Behavior::Detections(vec![]));
    let settings = DetectSettings {
        debug_upload_path: Some(path.clone()),
        ..settings()
    };
    let app = app_with(detector, settings);

    app.clone().oneshot(image_request(&png)).await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), png);

    let response = app.oneshot(image_request(b"not an image")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read(&path).unwrap(), b"not an image");
}
