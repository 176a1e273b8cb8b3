// ABOUTME: Image uploads for project logos and support screenshots
// ABOUTME: Size, declared MIME, and the sniffed image format are checked before anything is written

use std::io::Cursor;

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use image::{ImageFormat, ImageReader};
use serde::Serialize;
use tracing::{debug, info};

use backstage_core::constants::MAX_UPLOAD_BYTES;
use backstage_core::generate_id;

use crate::error::{ApiResult, AppError};
use crate::response::created;
use crate::state::AppState;

/// Namespaces an upload may be stored under
pub const UPLOAD_NAMESPACES: [&str; 2] = ["logos", "support"];

/// Accepted content types, the format their bytes must decode as, and the stored extension.
/// Scriptable formats such as SVG are never accepted.
const IMAGE_TYPES: [(&str, ImageFormat, &str); 4] = [
    ("image/png", ImageFormat::Png, "png"),
    ("image/jpeg", ImageFormat::Jpeg, "jpg"),
    ("image/gif", ImageFormat::Gif, "gif"),
    ("image/webp", ImageFormat::WebP, "webp"),
];

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub path: String,
    pub content_type: String,
    pub size: usize,
    pub width: u32,
    pub height: u32,
}

/// Expected format and extension for an accepted image MIME type
pub fn image_type(content_type: &str) -> Option<(ImageFormat, &'static str)> {
    let normalized = content_type.split(';').next().unwrap_or_default().trim().to_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _, _)| *mime == normalized)
        .map(|(_, format, ext)| (*format, *ext))
}

/// Sniff the bytes and read the image header; the detected format must be `expected`
pub fn inspect_image(bytes: &[u8], expected: ImageFormat) -> Result<(u32, u32), AppError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| AppError::validation("file is not a readable image"))?;

    match reader.format() {
        Some(detected) if detected == expected => {}
        Some(detected) => {
            return Err(AppError::validation(format!(
                "file content is {:?} but was declared as {:?}",
                detected, expected
            )))
        }
        None => return Err(AppError::validation("file is not a recognized image")),
    }

    reader.into_dimensions().map_err(|e| {
        debug!("Rejected upload with unreadable image header: {}", e);
        AppError::validation("file is not a readable image")
    })
}

/// Store the first `file` part of a multipart body
pub async fn upload_file(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    if !UPLOAD_NAMESPACES.contains(&namespace.as_str()) {
        return Err(AppError::validation(format!(
            "namespace must be one of {}",
            UPLOAD_NAMESPACES.join(", ")
        )));
    }

    let field = loop {
        match multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("invalid multipart body: {}", e.body_text())))?
        {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(AppError::validation("file is required")),
        }
    };

    let content_type = field.content_type().unwrap_or_default().to_string();
    let (format, extension) = image_type(&content_type)
        .ok_or_else(|| AppError::validation("file must be a PNG, JPEG, GIF, or WebP image"))?;

    let bytes = field.bytes().await.map_err(|_| {
        AppError::validation(format!("file must be at most {} bytes", MAX_UPLOAD_BYTES))
    })?;
    if bytes.is_empty() {
        return Err(AppError::validation("file is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::validation(format!(
            "file must be at most {} bytes",
            MAX_UPLOAD_BYTES
        )));
    }
    let (width, height) = inspect_image(&bytes, format)?;

    let dir = state.settings.upload_dir.join(&namespace);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(AppError::internal)?;

    let file_name = format!("{}.{}", generate_id("img"), extension);
    tokio::fs::write(dir.join(&file_name), &bytes)
        .await
        .map_err(AppError::internal)?;

    let path = format!("{}/{}", namespace, file_name);
    info!(path = %path, size = bytes.len(), "Stored upload");

    Ok(created(UploadedFile {
        url: format!("{}/uploads/{}", state.settings.public_url.trim_end_matches('/'), path),
        path,
        content_type,
        size: bytes.len(),
        width,
        height,
    }))
}
