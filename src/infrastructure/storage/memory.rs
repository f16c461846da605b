//! In-memory storage implementation
//!
//! Backs every repository trait with two hash maps behind one async
//! `RwLock`. Atomic writes are applied to a staged copy and swapped in
//! only when every write succeeded, so readers never observe half of a
//! commit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{
    CreateUserDto, DocumentWrite, DomainError, DomainResult, Place, PlaceRepository,
    RecordRepository, RepositoryProvider, User, UserRepository, UserWithPlaces,
};

#[derive(Clone, Default)]
struct State {
    places: HashMap<String, Place>,
    users: HashMap<String, User>,
}

impl State {
    fn apply(&mut self, write: DocumentWrite) -> DomainResult<()> {
        match write {
            DocumentWrite::UpsertPlace(place) => {
                if !self.users.contains_key(&place.creator_id) {
                    return Err(DomainError::not_found("User", place.creator_id));
                }
                self.places.insert(place.id.clone(), place);
            }
            DocumentWrite::PushPlaceRef { user_id, place_id } => {
                if !self.places.contains_key(&place_id) {
                    return Err(DomainError::not_found("Place", place_id));
                }
                let user = self
                    .users
                    .get_mut(&user_id)
                    .ok_or_else(|| DomainError::not_found("User", user_id.clone()))?;
                if !user.owns_place(&place_id) {
                    user.place_ids.push(place_id);
                    user.updated_at = Utc::now();
                }
            }
            DocumentWrite::PullPlaceRef { user_id, place_id } => {
                let user = self
                    .users
                    .get_mut(&user_id)
                    .ok_or_else(|| DomainError::not_found("User", user_id.clone()))?;
                user.place_ids.retain(|id| id != &place_id);
                user.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    fn places_sorted(&self, filter: impl Fn(&Place) -> bool) -> Vec<Place> {
        let mut places: Vec<Place> = self.places.values().filter(|p| filter(p)).cloned().collect();
        places.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        places
    }
}

/// In-memory storage for development and testing
#[derive(Default)]
pub struct InMemoryStorage {
    state: RwLock<State>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn commit(
        &self,
        remove_place: Option<&str>,
        writes: Vec<DocumentWrite>,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();

        if let Some(place_id) = remove_place {
            if staged.places.remove(place_id).is_none() {
                return Err(DomainError::not_found("Place", place_id));
            }
        }
        for write in writes {
            staged.apply(write)?;
        }

        *state = staged;
        Ok(())
    }
}

#[async_trait]
impl PlaceRepository for InMemoryStorage {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Place>> {
        Ok(self.state.read().await.places.get(id).cloned())
    }

    async fn list_all(&self) -> DomainResult<Vec<Place>> {
        Ok(self.state.read().await.places_sorted(|_| true))
    }

    async fn update(&self, place: &Place) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let existing = state
            .places
            .get_mut(&place.id)
            .ok_or_else(|| DomainError::not_found("Place", place.id.clone()))?;
        existing.title = place.title.clone();
        existing.description = place.description.clone();
        existing.updated_at = place.updated_at;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn create(&self, dto: CreateUserDto) -> DomainResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == dto.email) {
            return Err(DomainError::Conflict(format!("email {}", dto.email)));
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: dto.name,
            email: dto.email,
            password_hash: dto.password_hash,
            image: dto.image,
            place_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_all(&self) -> DomainResult<Vec<User>> {
        let mut users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl RecordRepository for InMemoryStorage {
    async fn find_place(&self, id: &str) -> DomainResult<Option<Place>> {
        PlaceRepository::find_by_id(self, id).await
    }

    async fn find_user(&self, id: &str) -> DomainResult<Option<User>> {
        UserRepository::find_by_id(self, id).await
    }

    async fn find_user_with_places(&self, user_id: &str) -> DomainResult<Option<UserWithPlaces>> {
        let state = self.state.read().await;
        let Some(user) = state.users.get(user_id).cloned() else {
            return Ok(None);
        };
        let places = state.places_sorted(|p| user.owns_place(&p.id));
        Ok(Some(UserWithPlaces { user, places }))
    }

    async fn find_place_with_creator(&self, place_id: &str) -> DomainResult<Option<(Place, User)>> {
        let state = self.state.read().await;
        let Some(place) = state.places.get(place_id).cloned() else {
            return Ok(None);
        };
        let creator = state
            .users
            .get(&place.creator_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("User", place.creator_id.clone()))?;
        Ok(Some((place, creator)))
    }

    async fn save_atomically(&self, writes: Vec<DocumentWrite>) -> DomainResult<()> {
        self.commit(None, writes).await
    }

    async fn remove_atomically(
        &self,
        place: &Place,
        writes: Vec<DocumentWrite>,
    ) -> DomainResult<()> {
        self.commit(Some(&place.id), writes).await
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryStorage {
    fn places(&self) -> &dyn PlaceRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }

    fn records(&self) -> &dyn RecordRepository {
        self
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}
