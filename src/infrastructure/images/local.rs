//! Filesystem image store, served by the HTTP layer under `/uploads/images`

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::object_key;
use crate::application::ports::{ImageStore, ImageUpload, StoredImage};
use crate::domain::{DomainError, DomainResult};

pub struct LocalImageStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> DomainResult<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(DomainError::Storage(format!("Invalid image key: {}", key)));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, image: ImageUpload) -> DomainResult<StoredImage> {
        let extension = image.extension().ok_or_else(|| {
            DomainError::Validation(format!("Unsupported image type: {}", image.content_type))
        })?;
        let key = object_key("", extension);
        let path = self.path_for(&key)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to prepare image dir: {}", e)))?;
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| DomainError::Storage(format!("Failed to write image: {}", e)))?;

        debug!(path = %path.display(), "Image stored locally");
        Ok(StoredImage {
            url: format!("{}/{}", self.public_base_url, key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Storage(format!("Failed to delete image: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "http://localhost:5001/uploads/images/");

        let stored = store
            .upload(ImageUpload::new(vec![0x89, b'P', b'N', b'G'], "image/png"))
            .await
            .unwrap();

        assert!(stored.key.ends_with(".png"));
        assert_eq!(
            stored.url,
            format!("http://localhost:5001/uploads/images/{}", stored.key)
        );
        let path = dir.path().join(&stored.key);
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x89, b'P', b'N', b'G']);

        store.delete(&stored.key).await.unwrap();
        assert!(!path.exists());
        // Already gone
        store.delete(&stored.key).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "http://localhost/uploads/images");

        let err = store.delete("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "http://localhost/uploads/images");

        let err = store
            .upload(ImageUpload::new(vec![1], "image/gif"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
