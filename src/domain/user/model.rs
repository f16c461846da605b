use chrono::{DateTime, Utc};

use crate::domain::place::{ImageRef, Place};

/// User model
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: Option<ImageRef>,
    /// Ids of places this user created. Order carries no meaning.
    pub place_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn owns_place(&self, place_id: &str) -> bool {
        self.place_ids.iter().any(|id| id == place_id)
    }
}

/// A user together with its resolved place set
#[derive(Clone, Debug)]
pub struct UserWithPlaces {
    pub user: User,
    pub places: Vec<Place>,
}
