use async_trait::async_trait;

use super::Place;
use crate::shared::DomainResult;

/// Single-collection access to places.
///
/// Writes that touch a user's place set go through
/// [`RecordRepository`](crate::domain::RecordRepository) instead.
#[async_trait]
pub trait PlaceRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Place>>;
    async fn list_all(&self) -> DomainResult<Vec<Place>>;

    /// Persist title, description and `updated_at` of an existing place.
    async fn update(&self, place: &Place) -> DomainResult<()>;
}
