pub mod place;
pub mod repositories;
pub mod user;

// Re-export commonly used types
pub use place::{Coordinates, ImageRef, Place, PlaceRepository};
pub use repositories::{DocumentWrite, RecordRepository, RepositoryProvider};
pub use user::{CreateUserDto, User, UserRepository, UserWithPlaces};

// Re-export DomainError from shared for convenience
pub use crate::shared::types::{DomainError, DomainResult};
