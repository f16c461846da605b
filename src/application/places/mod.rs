//! Place use-cases and their compensation machinery

pub mod compensation;
pub mod workflow;

pub use compensation::{discard_image, Compensation, CompensationLog};
pub use workflow::{NewPlace, PlaceChanges, PlaceWorkflow};
