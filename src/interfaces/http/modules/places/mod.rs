//! Places module: listing, creation, edits and removal of places

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
