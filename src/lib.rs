//! # Places Service
//!
//! Backend for sharing places. A place has a title, a description, an
//! address geocoded to coordinates and an uploaded image, and belongs to
//! the user who created it.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core entities, repository traits and errors
//! - **application**: Place workflow with compensation, identity use-cases, outbound ports
//! - **infrastructure**: Database, geocoder, image stores, crypto
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: Runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

// Re-export API router
pub use interfaces::http::create_api_router;
