//! Mapping of domain errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::domain::DomainError;

const INTERNAL_MESSAGE: &str = "Something went wrong, please try again later.";

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// Malformed request that never reached the domain (bad JSON, broken multipart)
    BadRequest { status: StatusCode, message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::Validation(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(e) => status_for(e),
            Self::BadRequest { status, .. } => *status,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self::Domain(e)
    }
}

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Validation(_) | DomainError::Geocode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Storage(_) | DomainError::Persistence(_) | DomainError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Client-facing text. Internal failures are logged and replaced.
fn public_message(e: &DomainError) -> String {
    if e.is_internal() {
        error!(kind = e.kind(), error = %e, "Request failed with internal error");
        return INTERNAL_MESSAGE.to_string();
    }
    match e {
        DomainError::NotFound { entity, value, .. } => {
            format!("Could not find {} for the provided id '{}'.", entity.to_lowercase(), value)
        }
        DomainError::Validation(msg)
        | DomainError::Conflict(msg)
        | DomainError::Unauthorized(msg)
        | DomainError::Forbidden(msg)
        | DomainError::Geocode(msg)
        | DomainError::Storage(msg)
        | DomainError::Persistence(msg)
        | DomainError::Internal(msg) => msg.clone(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Domain(e) => public_message(&e),
            Self::BadRequest { message, .. } => message,
        };
        let body = ApiResponse::<()>::error(message, status.as_u16());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::not_found("Place", "p1"), StatusCode::NOT_FOUND),
            (DomainError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (DomainError::Validation("bad".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::Geocode("none".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::Conflict("dup".into()), StatusCode::CONFLICT),
            (DomainError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (DomainError::Storage("s3".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::Persistence("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::Internal("jwt".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) =
            body_json(DomainError::Persistence("connection reset by peer".into()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 500);
        assert_eq!(body["error"], INTERNAL_MESSAGE);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let (status, body) = body_json(
            DomainError::Geocode("Could not find location for address entered.".into()).into(),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Could not find location for address entered.");
        assert_eq!(body["code"], 422);
    }
}
