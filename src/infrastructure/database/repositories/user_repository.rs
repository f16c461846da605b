use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use super::{db_err, write_err};
use crate::domain::{CreateUserDto, DomainResult, ImageRef, User, UserRepository};
use crate::infrastructure::database::entities::{user, user_place};

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn user_model_to_domain(model: user::Model, place_ids: Vec<String>) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        image: ImageRef::from_parts(model.image_url, model.image_key),
        place_ids,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub(super) async fn load_place_ids<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> DomainResult<Vec<String>> {
    let rows = user_place::Entity::find()
        .filter(user_place::Column::UserId.eq(user_id))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(rows.into_iter().map(|row| row.place_id).collect())
}

pub(super) async fn load_user<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
) -> DomainResult<Option<User>> {
    let Some(model) = user::Entity::find_by_id(user_id)
        .one(conn)
        .await
        .map_err(db_err)?
    else {
        return Ok(None);
    };

    let place_ids = load_place_ids(conn, &model.id).await?;
    Ok(Some(user_model_to_domain(model, place_ids)))
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, dto: CreateUserDto) -> DomainResult<User> {
        let now = Utc::now();

        let new_user = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(dto.name),
            email: Set(dto.email.clone()),
            password_hash: Set(dto.password_hash),
            image_url: Set(dto.image.as_ref().map(|i| i.url.clone())),
            image_key: Set(dto.image.as_ref().map(|i| i.key.clone())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = new_user
            .insert(&self.db)
            .await
            .map_err(|e| write_err(e, &format!("email {}", dto.email)))?;

        Ok(user_model_to_domain(model, Vec::new()))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        load_user(&self.db, id).await
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let Some(model) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let place_ids = load_place_ids(&self.db, &model.id).await?;
        Ok(Some(user_model_to_domain(model, place_ids)))
    }

    async fn list_all(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut by_user: HashMap<String, Vec<String>> = HashMap::new();
        for row in user_place::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            by_user.entry(row.user_id).or_default().push(row.place_id);
        }

        Ok(models
            .into_iter()
            .map(|model| {
                let place_ids = by_user.remove(&model.id).unwrap_or_default();
                user_model_to_domain(model, place_ids)
            })
            .collect())
    }
}
