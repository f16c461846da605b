//! Users module: signup, login and user lookups

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
