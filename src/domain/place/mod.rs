//! Place aggregate
//!
//! Contains the Place entity, its value types, and the repository interface.

pub mod model;
pub mod repository;

pub use model::{Coordinates, ImageRef, Place};
pub use repository::PlaceRepository;
