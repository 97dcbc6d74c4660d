use crate::error::DetectError;
use axum::{body::Bytes, extract::Multipart};
use image::{DynamicImage, ImageError, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Multipart field carrying the upload.
pub const IMAGE_FIELD: &str = "image";

/// Pull the bytes of the `image` file part out of a multipart body. Other
/// fields are skipped, and so is a plain form value named `image`: only a
/// part carrying a `filename` counts as an upload. A missing or empty file
/// is `MissingUpload`.
pub async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, DetectError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if field.file_name().is_none() {
            tracing::debug!("Skipping image form value without a filename");
            continue;
        }

        tracing::debug!(
            file_name = field.file_name(),
            content_type = field.content_type(),
            "Reading image field"
        );

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(DetectError::MissingUpload);
        }
        return Ok(bytes);
    }

    Err(DetectError::MissingUpload)
}

/// Decode an upload. Format is sniffed from the content, never from the
/// file name or declared content type.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DetectError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DetectError::ImageDecode(e.to_string()))?;

    let Some(format) = reader.format() else {
        return Err(DetectError::UnreadableImage);
    };

    let image = reader.decode().map_err(|e| match e {
        ImageError::Unsupported(_) => DetectError::UnreadableImage,
        other => DetectError::ImageDecode(other.to_string()),
    })?;

    tracing::info!(
        format = ?format,
        width = image.width(),
        height = image.height(),
        "Image loaded"
    );

    Ok(image)
}

/// Overwrite `path` with the raw upload. Diagnostic only: failures are
/// logged and otherwise ignored.
pub async fn dump_upload(path: &Path, bytes: &[u8]) {
    match tokio::fs::write(path, bytes).await {
        Ok(()) => tracing::debug!(path = %path.display(), size = bytes.len(), "Saved upload"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to save upload"),
    }
}
