//! Transactional access spanning the places and users tables

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::warn;

use super::place_repository::{place_model_to_domain, place_to_active_model};
use super::user_repository::{load_place_ids, load_user, user_model_to_domain};
use super::{db_err, write_err};
use crate::domain::{
    DocumentWrite, DomainError, DomainResult, Place, RecordRepository, User, UserWithPlaces,
};
use crate::infrastructure::database::entities::{place, user, user_place};

pub struct SeaOrmRecordRepository {
    db: DatabaseConnection,
}

impl SeaOrmRecordRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Commit when every write succeeded, roll back otherwise.
async fn finish(txn: DatabaseTransaction, result: DomainResult<()>) -> DomainResult<()> {
    match result {
        Ok(()) => txn.commit().await.map_err(db_err),
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn apply_all(txn: &DatabaseTransaction, writes: Vec<DocumentWrite>) -> DomainResult<()> {
    for write in writes {
        apply_write(txn, write).await?;
    }
    Ok(())
}

async fn delete_place(txn: &DatabaseTransaction, place_id: &str) -> DomainResult<()> {
    let deleted = place::Entity::delete_by_id(place_id)
        .exec(txn)
        .await
        .map_err(db_err)?;
    if deleted.rows_affected == 0 {
        return Err(DomainError::not_found("Place", place_id));
    }
    Ok(())
}

async fn user_exists(txn: &DatabaseTransaction, user_id: &str) -> DomainResult<()> {
    user::Entity::find_by_id(user_id)
        .one(txn)
        .await
        .map_err(db_err)?
        .map(|_| ())
        .ok_or_else(|| DomainError::not_found("User", user_id))
}

async fn touch_user(txn: &DatabaseTransaction, user_id: &str) -> DomainResult<()> {
    user::Entity::update_many()
        .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(user::Column::Id.eq(user_id))
        .exec(txn)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn apply_write(txn: &DatabaseTransaction, write: DocumentWrite) -> DomainResult<()> {
    match write {
        DocumentWrite::UpsertPlace(place) => {
            user_exists(txn, &place.creator_id).await?;

            let exists = place::Entity::find_by_id(place.id.as_str())
                .one(txn)
                .await
                .map_err(db_err)?
                .is_some();

            let active = place_to_active_model(&place);
            if exists {
                active.update(txn).await.map_err(db_err)?;
            } else {
                active
                    .insert(txn)
                    .await
                    .map_err(|e| write_err(e, &format!("place {}", place.id)))?;
            }
        }
        DocumentWrite::PushPlaceRef { user_id, place_id } => {
            user_exists(txn, &user_id).await?;
            if place::Entity::find_by_id(place_id.as_str())
                .one(txn)
                .await
                .map_err(db_err)?
                .is_none()
            {
                return Err(DomainError::not_found("Place", place_id));
            }

            let linked = user_place::Entity::find_by_id((user_id.clone(), place_id.clone()))
                .one(txn)
                .await
                .map_err(db_err)?
                .is_some();
            if !linked {
                user_place::ActiveModel {
                    user_id: Set(user_id.clone()),
                    place_id: Set(place_id),
                }
                .insert(txn)
                .await
                .map_err(db_err)?;
                touch_user(txn, &user_id).await?;
            }
        }
        DocumentWrite::PullPlaceRef { user_id, place_id } => {
            user_exists(txn, &user_id).await?;
            user_place::Entity::delete_by_id((user_id.clone(), place_id))
                .exec(txn)
                .await
                .map_err(db_err)?;
            touch_user(txn, &user_id).await?;
        }
    }
    Ok(())
}

#[async_trait]
impl RecordRepository for SeaOrmRecordRepository {
    async fn find_place(&self, id: &str) -> DomainResult<Option<Place>> {
        let model = place::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(place_model_to_domain))
    }

    async fn find_user(&self, id: &str) -> DomainResult<Option<User>> {
        load_user(&self.db, id).await
    }

    async fn find_user_with_places(&self, user_id: &str) -> DomainResult<Option<UserWithPlaces>> {
        let Some(user) = load_user(&self.db, user_id).await? else {
            return Ok(None);
        };

        let places = if user.place_ids.is_empty() {
            Vec::new()
        } else {
            place::Entity::find()
                .filter(place::Column::Id.is_in(user.place_ids.clone()))
                .order_by_asc(place::Column::CreatedAt)
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(place_model_to_domain)
                .collect()
        };

        Ok(Some(UserWithPlaces { user, places }))
    }

    async fn find_place_with_creator(&self, place_id: &str) -> DomainResult<Option<(Place, User)>> {
        let Some((place_model, creator_model)) = place::Entity::find_by_id(place_id)
            .find_also_related(user::Entity)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let creator_model = creator_model
            .ok_or_else(|| DomainError::not_found("User", place_model.creator_id.clone()))?;
        let place_ids = load_place_ids(&self.db, &creator_model.id).await?;

        Ok(Some((
            place_model_to_domain(place_model),
            user_model_to_domain(creator_model, place_ids),
        )))
    }

    async fn save_atomically(&self, writes: Vec<DocumentWrite>) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let result = apply_all(&txn, writes).await;
        finish(txn, result).await
    }

    async fn remove_atomically(
        &self,
        place: &Place,
        writes: Vec<DocumentWrite>,
    ) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let result = match delete_place(&txn, &place.id).await {
            Ok(()) => apply_all(&txn, writes).await,
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::domain::{Coordinates, CreateUserDto, ImageRef, PlaceRepository, UserRepository};
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::repositories::{
        SeaOrmPlaceRepository, SeaOrmUserRepository,
    };

    async fn setup() -> DatabaseConnection {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_user(db: &DatabaseConnection, email: &str) -> User {
        SeaOrmUserRepository::new(db.clone())
            .create(CreateUserDto {
                name: "Ada".into(),
                email: email.into(),
                password_hash: "hash".into(),
                image: None,
            })
            .await
            .unwrap()
    }

    fn place_for(user: &User) -> Place {
        Place::new(
            "Googleplex",
            "Headquarters campus",
            "1600 Amphitheatre Parkway",
            Coordinates::new(37.4224, -122.0841),
            Some(ImageRef {
                url: "https://cdn.test/images/a.png".into(),
                key: "images/a.png".into(),
            }),
            &user.id,
        )
    }

    fn link(user: &User, place: &Place) -> Vec<DocumentWrite> {
        vec![
            DocumentWrite::UpsertPlace(place.clone()),
            DocumentWrite::PushPlaceRef {
                user_id: user.id.clone(),
                place_id: place.id.clone(),
            },
        ]
    }

    #[tokio::test]
    async fn test_save_atomically_writes_both_tables() {
        let db = setup().await;
        let repo = SeaOrmRecordRepository::new(db.clone());
        let user = seed_user(&db, "ada@example.com").await;
        let place = place_for(&user);

        repo.save_atomically(link(&user, &place)).await.unwrap();

        let loaded = repo.find_user_with_places(&user.id).await.unwrap().unwrap();
        assert_eq!(loaded.user.place_ids, vec![place.id.clone()]);
        assert_eq!(loaded.places.len(), 1);
        assert_eq!(loaded.places[0].location, place.location);
        assert_eq!(loaded.places[0].image, place.image);

        let (found, creator) = repo.find_place_with_creator(&place.id).await.unwrap().unwrap();
        assert_eq!(found.id, place.id);
        assert_eq!(creator.id, user.id);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_everything() {
        let db = setup().await;
        let repo = SeaOrmRecordRepository::new(db.clone());
        let user = seed_user(&db, "ada@example.com").await;
        let place = place_for(&user);

        let err = repo
            .save_atomically(vec![
                DocumentWrite::UpsertPlace(place.clone()),
                DocumentWrite::PushPlaceRef {
                    user_id: "missing-user".into(),
                    place_id: place.id.clone(),
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { entity: "User", .. }));
        assert!(repo.find_place(&place.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_atomically_unlinks_and_second_call_is_not_found() {
        let db = setup().await;
        let repo = SeaOrmRecordRepository::new(db.clone());
        let user = seed_user(&db, "ada@example.com").await;
        let place = place_for(&user);
        repo.save_atomically(link(&user, &place)).await.unwrap();

        let pull = vec![DocumentWrite::PullPlaceRef {
            user_id: user.id.clone(),
            place_id: place.id.clone(),
        }];
        repo.remove_atomically(&place, pull.clone()).await.unwrap();

        assert!(repo.find_place(&place.id).await.unwrap().is_none());
        let reloaded = repo.find_user(&user.id).await.unwrap().unwrap();
        assert!(reloaded.place_ids.is_empty());

        let err = repo.remove_atomically(&place, pull).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Place", .. }));
    }

    #[tokio::test]
    async fn test_place_update_and_listing() {
        let db = setup().await;
        let repo = SeaOrmRecordRepository::new(db.clone());
        let places = SeaOrmPlaceRepository::new(db.clone());
        let user = seed_user(&db, "ada@example.com").await;
        let mut place = place_for(&user);
        repo.save_atomically(link(&user, &place)).await.unwrap();

        place.rewrite("T2", "Another description");
        places.update(&place).await.unwrap();

        let reread = places.find_by_id(&place.id).await.unwrap().unwrap();
        assert_eq!(reread.title, "T2");
        assert_eq!(reread.address, "1600 Amphitheatre Parkway");
        assert_eq!(places.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let db = setup().await;
        let users = SeaOrmUserRepository::new(db.clone());
        seed_user(&db, "ada@example.com").await;

        let err = users
            .create(CreateUserDto {
                name: "Other".into(),
                email: "ada@example.com".into(),
                password_hash: "x".into(),
                image: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(users.list_all().await.unwrap().len(), 1);
    }
}
