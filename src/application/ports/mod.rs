pub mod outbound;

pub use outbound::{image_extension, AddressResolver, ImageStore, ImageUpload, StoredImage};
