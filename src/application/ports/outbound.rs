//! Outbound ports: interfaces to the external services the workflows call
//!
//! [`AddressResolver`] and [`ImageStore`] decouple the application
//! services from the concrete geocoding API and object store. Production
//! implementations live in `infrastructure::geocoding` and
//! `infrastructure::images`.

use async_trait::async_trait;

use crate::domain::{Coordinates, ImageRef};
use crate::shared::DomainResult;

// ── Image payloads ─────────────────────────────────────────────

/// Raw image received from a client, not yet stored anywhere.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File extension for the accepted image types, `None` for anything else.
    pub fn extension(&self) -> Option<&'static str> {
        image_extension(&self.content_type)
    }
}

/// Map an accepted image content type to the extension used in storage keys.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpeg"),
        _ => None,
    }
}

/// Result of a successful upload.
pub type StoredImage = ImageRef;

// ── AddressResolver ────────────────────────────────────────────

/// Translates a free-text address into coordinates.
///
/// Fails with `DomainError::Geocode` when the service finds nothing or
/// cannot be reached. Callers never retry.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> DomainResult<Coordinates>;
}

// ── ImageStore ─────────────────────────────────────────────────

/// Object storage for uploaded images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the payload and return where it can be fetched from.
    ///
    /// Fails with `DomainError::Storage`.
    async fn upload(&self, image: ImageUpload) -> DomainResult<StoredImage>;

    /// Remove a previously uploaded object.
    ///
    /// Callers treat this as best-effort: errors are logged, never escalated.
    async fn delete(&self, key: &str) -> DomainResult<()>;
}
