//! SeaORM implementation of RepositoryProvider

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::domain::{
    DomainError, DomainResult, PlaceRepository, RecordRepository, RepositoryProvider,
    UserRepository,
};

use super::place_repository::SeaOrmPlaceRepository;
use super::record_repository::SeaOrmRecordRepository;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let place = repos.places().find_by_id(&place_id).await?;
/// repos.records().save_atomically(writes).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    places: SeaOrmPlaceRepository,
    users: SeaOrmUserRepository,
    records: SeaOrmRecordRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            places: SeaOrmPlaceRepository::new(db.clone()),
            users: SeaOrmUserRepository::new(db.clone()),
            records: SeaOrmRecordRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn places(&self) -> &dyn PlaceRepository {
        &self.places
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn records(&self) -> &dyn RecordRepository {
        &self.records
    }

    async fn ping(&self) -> DomainResult<()> {
        self.db
            .ping()
            .await
            .map_err(|e| DomainError::Persistence(format!("Database ping failed: {}", e)))
    }
}
