//! Image store adapters

pub mod local;
pub mod s3;

pub use local::LocalImageStore;
pub use s3::{S3ImageStore, S3ImageStoreConfig};

/// `{prefix}/{uuid}.{ext}`, or just `{uuid}.{ext}` without a prefix.
pub(crate) fn object_key(prefix: &str, extension: &str) -> String {
    let name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}
