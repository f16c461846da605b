//! Repository traits for the domain layer
//!
//! Contains:
//! - `RecordRepository`: cross-collection reads and all-or-nothing writes
//! - `RepositoryProvider`: unified access to all per-aggregate repositories

use async_trait::async_trait;

use super::place::{Place, PlaceRepository};
use super::user::{User, UserRepository, UserWithPlaces};
use crate::shared::DomainResult;

/// One document mutation inside an atomic write.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentWrite {
    /// Insert the place, or overwrite it if the id already exists.
    UpsertPlace(Place),
    /// Add a place id to a user's place set.
    PushPlaceRef { user_id: String, place_id: String },
    /// Remove a place id from a user's place set.
    PullPlaceRef { user_id: String, place_id: String },
}

// ── RecordRepository ────────────────────────────────────────────

/// Persistence contract that spans the place and user collections.
///
/// Every method that takes `writes` applies all of them or none of them.
/// A failed commit leaves both collections exactly as they were.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn find_place(&self, id: &str) -> DomainResult<Option<Place>>;
    async fn find_user(&self, id: &str) -> DomainResult<Option<User>>;
    async fn find_user_with_places(&self, user_id: &str) -> DomainResult<Option<UserWithPlaces>>;
    async fn find_place_with_creator(&self, place_id: &str) -> DomainResult<Option<(Place, User)>>;

    async fn save_atomically(&self, writes: Vec<DocumentWrite>) -> DomainResult<()>;

    /// Delete `place` and apply `writes` in the same transaction.
    ///
    /// Fails with `DomainError::NotFound` if the place is already gone.
    async fn remove_atomically(&self, place: &Place, writes: Vec<DocumentWrite>)
        -> DomainResult<()>;
}

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let place = repos.places().find_by_id("p-1").await?;
///     repos.records().save_atomically(writes).await?;
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn places(&self) -> &dyn PlaceRepository;
    fn users(&self) -> &dyn UserRepository;
    fn records(&self) -> &dyn RecordRepository;

    /// Cheap round trip to the backing store, used by the health check.
    async fn ping(&self) -> DomainResult<()>;
}
