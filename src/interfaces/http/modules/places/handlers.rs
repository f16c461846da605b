//! Place API handlers
//!
//! Reads are public. Create, update and delete run behind
//! `auth_middleware` and act on behalf of the token subject.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use super::dto::{CreatePlaceRequest, DeletedPlace, PlaceDto, UpdatePlaceRequest};
use crate::application::{NewPlace, PlaceChanges, PlaceWorkflow};
use crate::interfaces::http::common::{validation_message, ApiError, ApiResponse, FormData, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct PlacesState {
    pub workflow: Arc<PlaceWorkflow>,
    pub max_upload_bytes: usize,
}

fn to_dtos(places: Vec<crate::domain::Place>) -> Vec<PlaceDto> {
    places.into_iter().map(PlaceDto::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/places",
    tag = "Places",
    responses(
        (status = 200, description = "All places", body = ApiResponse<Vec<PlaceDto>>)
    )
)]
pub async fn list_places(
    State(state): State<PlacesState>,
) -> Result<Json<ApiResponse<Vec<PlaceDto>>>, ApiError> {
    let places = state.workflow.list_places().await?;
    Ok(Json(ApiResponse::success(to_dtos(places))))
}

#[utoipa::path(
    get,
    path = "/api/places/{place_id}",
    tag = "Places",
    params(("place_id" = String, Path, description = "Place ID")),
    responses(
        (status = 200, description = "Place details", body = ApiResponse<PlaceDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_place(
    State(state): State<PlacesState>,
    Path(place_id): Path<String>,
) -> Result<Json<ApiResponse<PlaceDto>>, ApiError> {
    let place = state.workflow.get_place(&place_id).await?;
    Ok(Json(ApiResponse::success(PlaceDto::from(place))))
}

#[utoipa::path(
    get,
    path = "/api/places/user/{user_id}",
    tag = "Places",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Places created by the user", body = ApiResponse<Vec<PlaceDto>>),
        (status = 404, description = "User not found")
    )
)]
pub async fn places_for_user(
    State(state): State<PlacesState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PlaceDto>>>, ApiError> {
    let places = state.workflow.places_for_user(&user_id).await?;
    Ok(Json(ApiResponse::success(to_dtos(places))))
}

#[utoipa::path(
    post,
    path = "/api/places",
    tag = "Places",
    security(("bearer_auth" = [])),
    request_body(content = CreatePlaceRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Place created", body = ApiResponse<PlaceDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Creator not found"),
        (status = 422, description = "Invalid input or unknown address")
    )
)]
pub async fn create_place(
    State(state): State<PlacesState>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PlaceDto>>), ApiError> {
    let mut form = FormData::read(multipart, state.max_upload_bytes).await?;
    let request = CreatePlaceRequest {
        title: form.text("title"),
        description: form.text("description"),
        address: form.text("address"),
    };
    request
        .validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;
    let image = form.take_image()?;

    let place = state
        .workflow
        .create(
            &user.user_id,
            NewPlace {
                title: request.title,
                description: request.description,
                address: request.address,
                image,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PlaceDto::from(place))),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/places/{place_id}",
    tag = "Places",
    security(("bearer_auth" = [])),
    params(("place_id" = String, Path, description = "Place ID")),
    request_body = UpdatePlaceRequest,
    responses(
        (status = 200, description = "Place updated", body = ApiResponse<PlaceDto>),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_place(
    State(state): State<PlacesState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(place_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdatePlaceRequest>,
) -> Result<Json<ApiResponse<PlaceDto>>, ApiError> {
    let place = state
        .workflow
        .update(
            &user.user_id,
            &place_id,
            PlaceChanges {
                title: request.title,
                description: request.description,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(PlaceDto::from(place))))
}

#[utoipa::path(
    delete,
    path = "/api/places/{place_id}",
    tag = "Places",
    security(("bearer_auth" = [])),
    params(("place_id" = String, Path, description = "Place ID")),
    responses(
        (status = 200, description = "Place deleted", body = ApiResponse<DeletedPlace>),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_place(
    State(state): State<PlacesState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(place_id): Path<String>,
) -> Result<Json<ApiResponse<DeletedPlace>>, ApiError> {
    state.workflow.delete(&user.user_id, &place_id).await?;

    Ok(Json(ApiResponse::success(DeletedPlace {
        message: "Deleted place.".to_string(),
    })))
}
