use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use super::db_err;
use crate::domain::{Coordinates, DomainError, DomainResult, ImageRef, Place, PlaceRepository};
use crate::infrastructure::database::entities::place;

pub struct SeaOrmPlaceRepository {
    db: DatabaseConnection,
}

impl SeaOrmPlaceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn place_model_to_domain(model: place::Model) -> Place {
    Place {
        id: model.id,
        title: model.title,
        description: model.description,
        address: model.address,
        location: Coordinates::new(model.lat, model.lng),
        image: ImageRef::from_parts(model.image_url, model.image_key),
        creator_id: model.creator_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub(super) fn place_to_active_model(place: &Place) -> place::ActiveModel {
    place::ActiveModel {
        id: Set(place.id.clone()),
        title: Set(place.title.clone()),
        description: Set(place.description.clone()),
        address: Set(place.address.clone()),
        lat: Set(place.location.lat),
        lng: Set(place.location.lng),
        image_url: Set(place.image.as_ref().map(|i| i.url.clone())),
        image_key: Set(place.image.as_ref().map(|i| i.key.clone())),
        creator_id: Set(place.creator_id.clone()),
        created_at: Set(place.created_at),
        updated_at: Set(place.updated_at),
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl PlaceRepository for SeaOrmPlaceRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Place>> {
        let model = place::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(place_model_to_domain))
    }

    async fn list_all(&self) -> DomainResult<Vec<Place>> {
        let models = place::Entity::find()
            .order_by_asc(place::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(place_model_to_domain).collect())
    }

    async fn update(&self, updated: &Place) -> DomainResult<()> {
        let existing = place::Entity::find_by_id(updated.id.as_str())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Place", updated.id.clone()))?;

        let mut active: place::ActiveModel = existing.into();
        active.title = Set(updated.title.clone());
        active.description = Set(updated.description.clone());
        active.updated_at = Set(updated.updated_at);
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }
}
