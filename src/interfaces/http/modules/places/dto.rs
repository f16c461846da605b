//! Place DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{Coordinates, Place};

/// Place API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: LocationDto,
    /// Public URL of the place image
    pub image: Option<String>,
    /// Id of the user who created the place
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct LocationDto {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinates> for LocationDto {
    fn from(c: Coordinates) -> Self {
        Self {
            lat: c.lat,
            lng: c.lng,
        }
    }
}

impl From<Place> for PlaceDto {
    fn from(p: Place) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            address: p.address,
            location: p.location.into(),
            image: p.image.map(|i| i.url),
            creator: p.creator_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Text parts of the create form. The image travels as the `image`
/// file part or as an `imageRaw` data URL.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePlaceRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: String,
    #[validate(length(min = 5, message = "must be at least 5 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub address: String,
}

/// Update place request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePlaceRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: String,
    #[validate(length(min = 5, message = "must be at least 5 characters"))]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedPlace {
    pub message: String,
}
