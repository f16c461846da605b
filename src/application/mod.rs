pub mod identity;
pub mod places;
pub mod ports;

// Re-export key types for convenience
pub use identity::{AuthResult, Signup, UserService};
pub use places::{NewPlace, PlaceChanges, PlaceWorkflow};
pub use ports::{AddressResolver, ImageStore, ImageUpload, StoredImage};
