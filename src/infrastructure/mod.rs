//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod geocoding;
pub mod images;
pub mod storage;

pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
pub use geocoding::{GoogleGeocoder, GoogleGeocoderConfig};
pub use images::{LocalImageStore, S3ImageStore, S3ImageStoreConfig};
pub use storage::InMemoryStorage;
