//! API Router with Swagger UI

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::ApiResponse;
use super::middleware::{auth_middleware, AuthState};
use super::modules::health::{self, HealthState};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::places::{self, PlacesState};
use super::modules::request_id::{request_id_middleware, REQUEST_ID_HEADER};
use super::modules::users::{self, UsersState};
use crate::application::{PlaceWorkflow, UserService};
use crate::domain::RepositoryProvider;

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by signup or login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Places
        places::list_places,
        places::get_place,
        places::places_for_user,
        places::create_place,
        places::update_place,
        places::delete_place,
        // Users
        users::list_users,
        users::get_user,
        users::signup,
        users::login,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            places::PlaceDto,
            places::LocationDto,
            places::CreatePlaceRequest,
            places::UpdatePlaceRequest,
            places::DeletedPlace,
            users::UserDto,
            users::SignupRequest,
            users::LoginRequest,
            users::AuthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Places", description = "Places with a geocoded address and an image"),
        (name = "Users", description = "Signup, login and user lookups"),
    ),
    info(
        title = "Places API",
        version = "1.0.0",
        description = "REST API for sharing places: each place has an address resolved to coordinates and an uploaded image",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Router settings taken from the server configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub cors_origins: Vec<String>,
    /// Largest accepted image, in bytes
    pub max_upload_bytes: usize,
    /// Served under `/uploads/images` when images are kept on local disk
    pub local_images_dir: Option<PathBuf>,
}

/// Create the API router with all routes
pub fn create_api_router(
    workflow: Arc<PlaceWorkflow>,
    user_service: Arc<UserService>,
    repos: Arc<dyn RepositoryProvider>,
    prometheus_handle: PrometheusHandle,
    options: RouterOptions,
) -> Router {
    let auth_state = AuthState {
        jwt_config: user_service.jwt_config().clone(),
    };
    let auth = middleware::from_fn_with_state(auth_state, auth_middleware);

    // ── Places: reads are public, writes need a token ──────────
    let places_state = PlacesState {
        workflow,
        max_upload_bytes: options.max_upload_bytes,
    };
    let place_routes = Router::new()
        .route(
            "/api/places",
            get(places::list_places).merge(post(places::create_place).route_layer(auth.clone())),
        )
        .route("/api/places/user/{user_id}", get(places::places_for_user))
        .route(
            "/api/places/{place_id}",
            get(places::get_place).merge(
                patch(places::update_place)
                    .delete(places::delete_place)
                    .route_layer(auth),
            ),
        )
        .with_state(places_state);

    // ── Users (public) ─────────────────────────────────────────
    let users_state = UsersState {
        users: user_service,
        max_upload_bytes: options.max_upload_bytes,
    };
    let user_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/signup", post(users::signup))
        .route("/api/users/login", post(users::login))
        .route("/api/users/{user_id}", get(users::get_user))
        .with_state(users_state);

    // ── Operational endpoints ──────────────────────────────────
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(HealthState {
            repos,
            started_at: Arc::new(Instant::now()),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(MetricsState {
            handle: prometheus_handle,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let mut router = Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(place_routes)
        .merge(user_routes);

    if let Some(dir) = options.local_images_dir {
        router = router.nest_service("/uploads/images", ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit(options.max_upload_bytes)))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(cors_layer(&options.cors_origins))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

/// Image limit plus room for the text parts; data URLs grow the image by a third.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes / 3 * 4 + 64 * 1024
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_place_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/places"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/places/{place_id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/users/signup"));
    }

    #[test]
    fn test_body_limit_leaves_room_for_data_urls() {
        let limit = body_limit(3 * 1024 * 1024);
        assert!(limit >= 4 * 1024 * 1024);
    }
}
