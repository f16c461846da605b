//! S3 (or S3-compatible) image store

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info, warn};

use super::object_key;
use crate::application::ports::{ImageStore, ImageUpload, StoredImage};
use crate::domain::{DomainError, DomainResult};

#[derive(Debug, Clone, Default)]
pub struct S3ImageStoreConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...)
    pub endpoint: Option<String>,
    /// Base for public URLs; defaults to the virtual-hosted bucket URL
    pub public_base_url: Option<String>,
    pub key_prefix: String,
}

impl S3ImageStoreConfig {
    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

pub struct S3ImageStore {
    client: S3Client,
    config: S3ImageStoreConfig,
}

impl S3ImageStore {
    /// Build the client from config, falling back to the default AWS
    /// credential chain when no static keys are configured.
    pub async fn connect(config: S3ImageStoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "places-config",
            ));
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(bucket = %config.bucket, region = %config.region, "S3 image store ready");
        Self {
            client: S3Client::from_conf(builder.build()),
            config,
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, image: ImageUpload) -> DomainResult<StoredImage> {
        let extension = image.extension().ok_or_else(|| {
            DomainError::Validation(format!("Unsupported image type: {}", image.content_type))
        })?;
        let key = object_key(&self.config.key_prefix, extension);
        let size = image.bytes.len();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(&image.content_type)
            .body(ByteStream::from(image.bytes))
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                warn!(key = %key, error = ?service_error, "S3 put_object failed");
                DomainError::Storage(format!("Failed to upload image: {}", service_error))
            })?;

        debug!(key = %key, size, "Image uploaded to S3");
        Ok(StoredImage {
            url: self.config.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                DomainError::Storage(format!("Failed to delete image: {}", e.into_service_error()))
            })?;
        Ok(())
    }
}
