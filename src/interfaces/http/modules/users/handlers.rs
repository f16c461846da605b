//! User API handlers
//!
//! Thin wrappers over `UserService` from the application/identity layer.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::dto::{AuthResponse, LoginRequest, SignupRequest, UserDto};
use crate::application::{Signup, UserService};
use crate::interfaces::http::common::{validation_message, ApiError, ApiResponse, FormData, ValidatedJson};

#[derive(Clone)]
pub struct UsersState {
    pub users: Arc<UserService>,
    pub max_upload_bytes: usize,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = ApiResponse<Vec<UserDto>>)
    )
)]
pub async fn list_users(
    State(state): State<UsersState>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.users.list_users().await?;
    let items = users.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    tag = "Users",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UsersState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.users.get_user(&user_id).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

#[utoipa::path(
    post,
    path = "/api/users/signup",
    tag = "Users",
    request_body(content = SignupRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "User created and signed in", body = ApiResponse<AuthResponse>),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn signup(
    State(state): State<UsersState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let mut form = FormData::read(multipart, state.max_upload_bytes).await?;
    let request = SignupRequest {
        name: form.text("name"),
        email: form.text("email"),
        password: form.text("password"),
    };
    request
        .validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;
    let image = form.take_image()?;

    let result = state
        .users
        .signup(Signup {
            name: request.name,
            email: request.email,
            password: request.password,
            image,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse::from(result))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<UsersState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    let result = state.users.login(&request.email, &request.password).await?;
    Ok(Json(ApiResponse::success(AuthResponse::from(result))))
}
