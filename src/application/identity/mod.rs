//! Identity module: signup, login and user lookups
//!
//! Contains the `UserService`, which owns password hashing and token
//! issuing so HTTP handlers stay thin.

pub mod service;

pub use service::{AuthResult, Signup, UserService};
