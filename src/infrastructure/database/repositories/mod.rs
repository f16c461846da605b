//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod place_repository;
pub mod record_repository;
pub mod repository_provider;
pub mod user_repository;

pub use place_repository::SeaOrmPlaceRepository;
pub use record_repository::SeaOrmRecordRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use user_repository::SeaOrmUserRepository;

use crate::domain::DomainError;

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Persistence(format!("Database error: {}", e))
}

/// Unique violations become `Conflict`; everything else is a persistence failure.
fn write_err(e: sea_orm::DbErr, conflict: &str) -> DomainError {
    let text = e.to_string();
    if text.contains("UNIQUE") || text.contains("duplicate") {
        DomainError::Conflict(conflict.to_string())
    } else {
        db_err(e)
    }
}
