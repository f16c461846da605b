//! Multipart form reader for the endpoints that accept an image
//!
//! Text parts are collected by name. The image comes either from a file
//! part named `image` or from an `imageRaw` text part holding a base64
//! data URL (`data:image/png;base64,...`).

use std::collections::HashMap;

use axum::extract::Multipart;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::ApiError;
use crate::application::ports::{image_extension, ImageUpload};

const IMAGE_FIELD: &str = "image";
const IMAGE_RAW_FIELD: &str = "imageRaw";

/// Fully buffered multipart body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart, max_image_bytes: usize) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.image = Some(ImageUpload::new(bytes.to_vec(), content_type));
                continue;
            }

            let value = field.text().await.map_err(multipart_error)?;
            if name == IMAGE_RAW_FIELD {
                if form.image.is_none() {
                    form.image = Some(decode_data_url(&value)?);
                }
            } else {
                form.fields.insert(name, value);
            }
        }

        if let Some(image) = &form.image {
            check_image(image, max_image_bytes)?;
        }
        Ok(form)
    }

    /// Text value of a part, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn take_image(&mut self) -> Result<ImageUpload, ApiError> {
        self.image
            .take()
            .ok_or_else(|| ApiError::validation("image: an image is required"))
    }
}

/// Decode `data:<mime>;base64,<payload>`.
pub fn decode_data_url(raw: &str) -> Result<ImageUpload, ApiError> {
    let invalid = || ApiError::validation("imageRaw: expected a base64 data URL");

    let rest = raw.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let content_type = header.strip_suffix(";base64").ok_or_else(invalid)?;
    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;

    Ok(ImageUpload::new(bytes, content_type))
}

fn check_image(image: &ImageUpload, max_bytes: usize) -> Result<(), ApiError> {
    if image_extension(&image.content_type).is_none() {
        return Err(ApiError::validation(
            "image: only png, jpeg and jpg images are accepted",
        ));
    }
    if image.bytes.is_empty() {
        return Err(ApiError::validation("image: the file is empty"));
    }
    if image.bytes.len() > max_bytes {
        return Err(ApiError::validation(format!(
            "image: the file exceeds {} bytes",
            max_bytes
        )));
    }
    Ok(())
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest {
        status: err.status(),
        message: err.body_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;

    const BOUNDARY: &str = "XBOUNDARY";
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a];

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .into_bytes()
    }

    fn file_part(name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"pic\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(bytes);
        part.extend_from_slice(b"\r\n");
        part
    }

    async fn handler(multipart: Multipart) -> axum::response::Response {
        match FormData::read(multipart, 1024).await {
            Ok(mut form) => match form.take_image() {
                Ok(image) => format!("{}:{}:{}", form.text("title"), image.content_type, image.bytes.len())
                    .into_response(),
                Err(e) => e.into_response(),
            },
            Err(e) => e.into_response(),
        }
    }

    async fn send(parts: Vec<Vec<u8>>) -> (StatusCode, String) {
        use tower::Service;
        let mut body: Vec<u8> = parts.concat();
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let mut svc = Router::new().route("/upload", post(handler)).into_service();
        let resp = svc.call(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn test_file_part_is_read() {
        let (status, body) = send(vec![
            text_part("title", "Tower"),
            file_part("image", "image/png", PNG),
        ])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Tower:image/png:6");
    }

    #[tokio::test]
    async fn test_data_url_part_is_decoded() {
        let raw = format!("data:image/jpeg;base64,{}", STANDARD.encode(PNG));
        let (status, body) = send(vec![
            text_part("title", "Tower"),
            text_part("imageRaw", &raw),
        ])
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Tower:image/jpeg:6");
    }

    #[tokio::test]
    async fn test_missing_image_is_422() {
        let (status, _) = send(vec![text_part("title", "Tower")]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_422() {
        let (status, body) = send(vec![file_part("image", "image/gif", PNG)]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("png, jpeg and jpg"));
    }

    #[tokio::test]
    async fn test_oversized_image_is_422() {
        let big = vec![0u8; 2048];
        let (status, _) = send(vec![file_part("image", "image/png", &big)]).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_decode_data_url_rejects_plain_text() {
        assert!(decode_data_url("not a data url").is_err());
        assert!(decode_data_url("data:image/png,abc").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }
}
