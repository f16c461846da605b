//! Place domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinates returned by the address resolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Reference to an uploaded object: public URL plus the storage key
/// needed to delete it again. Both parts always travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub key: String,
}

impl ImageRef {
    /// Rebuild an image reference from two nullable columns.
    ///
    /// Returns `None` unless both halves are present.
    pub fn from_parts(url: Option<String>, key: Option<String>) -> Option<Self> {
        match (url, key) {
            (Some(url), Some(key)) => Some(Self { url, key }),
            _ => None,
        }
    }
}

/// Place model
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Coordinates,
    pub image: Option<ImageRef>,
    /// Owning user. Never changes after creation.
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Place {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        address: impl Into<String>,
        location: Coordinates,
        image: Option<ImageRef>,
        creator_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            address: address.into(),
            location,
            image,
            creator_id: creator_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }

    /// Replace the mutable text fields. Address, location, image and
    /// creator are fixed at creation.
    pub fn rewrite(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.title = title.into();
        self.description = description.into();
        self.updated_at = Utc::now();
    }
}
