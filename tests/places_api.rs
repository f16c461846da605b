//! End-to-end HTTP tests: the full router over the in-memory store, the
//! real Google geocoder client pointed at a mock server, and the local
//! image store in a temp dir.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use httpmock::prelude::*;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::Service;

use places_service::application::{PlaceWorkflow, UserService};
use places_service::create_api_router;
use places_service::infrastructure::crypto::JwtConfig;
use places_service::infrastructure::{
    GoogleGeocoder, GoogleGeocoderConfig, InMemoryStorage, LocalImageStore,
};
use places_service::interfaces::http::RouterOptions;
use places_service::shared::CallTimeouts;

const BOUNDARY: &str = "places-test-boundary";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const GOOGLEPLEX: &str = "1600 Amphitheatre Parkway";

struct TestApp {
    router: Router,
    images_dir: tempfile::TempDir,
    _geocoder: MockServer,
}

impl TestApp {
    async fn start() -> Self {
        let geocoder = MockServer::start_async().await;
        geocoder
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/geocode/json")
                    .query_param("address", GOOGLEPLEX);
                then.status(200).json_body(json!({
                    "status": "OK",
                    "results": [{"geometry": {"location": {"lat": 37.4224, "lng": -122.0841}}}]
                }));
            })
            .await;
        geocoder
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/geocode/json")
                    .query_param("address", "Nowhere at all");
                then.status(200)
                    .json_body(json!({"status": "ZERO_RESULTS", "results": []}));
            })
            .await;

        let images_dir = tempfile::tempdir().unwrap();
        let repos = Arc::new(InMemoryStorage::new());
        let images = Arc::new(LocalImageStore::new(
            images_dir.path(),
            "http://localhost:5001/uploads/images",
        ));
        let resolver = Arc::new(GoogleGeocoder::new(GoogleGeocoderConfig {
            base_url: geocoder.url("/geocode/json"),
            api_key: "test-key".into(),
            request_timeout: Duration::from_secs(5),
        }));
        let timeouts = CallTimeouts {
            geocoder: Duration::from_secs(5),
            storage: Duration::from_secs(5),
            database: Duration::from_secs(5),
        };

        let workflow = Arc::new(PlaceWorkflow::new(
            repos.clone(),
            resolver,
            images.clone(),
            timeouts,
        ));
        let users = Arc::new(UserService::new(
            repos.clone(),
            images,
            JwtConfig::default(),
            4,
            timeouts,
        ));
        let router = create_api_router(
            workflow,
            users,
            repos,
            PrometheusBuilder::new().build_recorder().handle(),
            RouterOptions {
                cors_origins: vec!["http://localhost:3000".into()],
                max_upload_bytes: 1024 * 1024,
                local_images_dir: Some(images_dir.path().to_path_buf()),
            },
        );

        Self {
            router,
            images_dir,
            _geocoder: geocoder,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let mut svc = self.router.clone().into_service();
        let resp = svc.call(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn signup(&self, name: &str, email: &str) -> (String, String) {
        let req = multipart_request(
            "/api/users/signup",
            None,
            &[("name", name), ("email", email), ("password", "secret123")],
            true,
        );
        let (status, body) = self.send(req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["userId"].as_str().unwrap().to_string(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_place(&self, token: &str, title: &str, address: &str) -> (StatusCode, Value) {
        let req = multipart_request(
            "/api/places",
            Some(token),
            &[
                ("title", title),
                ("description", "A very nice place"),
                ("address", address),
            ],
            true,
        );
        self.send(req).await
    }

    fn stored_images(&self) -> usize {
        count_files(self.images_dir.path())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn multipart_request(
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    with_image: bool,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if with_image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"pic.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(PNG);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn place_lifecycle_over_http() {
    let app = TestApp::start().await;
    let (user_id, token) = app.signup("Ada", "ada@example.com").await;

    // Create
    let (status, body) = app.create_place(&token, "Googleplex", GOOGLEPLEX).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let place = &body["data"];
    let place_id = place["id"].as_str().unwrap().to_string();
    assert_eq!(place["creator"], user_id.as_str());
    assert_eq!(place["location"]["lat"], 37.4224);
    assert_eq!(place["location"]["lng"], -122.0841);
    assert!(place["image"].as_str().unwrap().starts_with("http://localhost:5001/uploads/images/"));

    // The creator's place set grew by one
    let (_, body) = app.get(&format!("/api/users/{user_id}")).await;
    assert_eq!(body["data"]["places"], json!([place_id]));
    let (_, body) = app.get(&format!("/api/places/user/{user_id}")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Update keeps address and location
    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/api/places/{place_id}"),
            Some(&token),
            json!({"title": "T2", "description": "Still a nice place"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, body) = app.get(&format!("/api/places/{place_id}")).await;
    assert_eq!(body["data"]["title"], "T2");
    assert_eq!(body["data"]["address"], GOOGLEPLEX);
    assert_eq!(body["data"]["location"]["lat"], 37.4224);

    // Delete twice
    let images_before = app.stored_images();
    let (status, _) = app
        .send(authed("DELETE", &format!("/api/places/{place_id}"), &token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stored_images(), images_before - 1);

    let (status, body) = app
        .send(authed("DELETE", &format!("/api/places/{place_id}"), &token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (_, body) = app.get(&format!("/api/users/{user_id}")).await;
    assert_eq!(body["data"]["places"], json!([]));
}

#[tokio::test]
async fn writes_require_a_token() {
    let app = TestApp::start().await;

    let req = multipart_request(
        "/api/places",
        None,
        &[("title", "X"), ("description", "Somewhere"), ("address", GOOGLEPLEX)],
        true,
    );
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(json_request(
            "PATCH",
            "/api/places/anything",
            Some("not-a-jwt"),
            json!({"title": "T", "description": "Long enough"}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay public
    let (status, body) = app.get("/api/places").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn only_the_creator_may_edit_or_delete() {
    let app = TestApp::start().await;
    let (_, owner) = app.signup("Owner", "owner@example.com").await;
    let (_, intruder) = app.signup("Intruder", "intruder@example.com").await;

    let (_, body) = app.create_place(&owner, "Mine", GOOGLEPLEX).await;
    let place_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/api/places/{place_id}"),
            Some(&intruder),
            json!({"title": "Stolen", "description": "Not yours anymore"}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You are not allowed to edit this place.");

    let (status, _) = app
        .send(authed("DELETE", &format!("/api/places/{place_id}"), &intruder))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&format!("/api/places/{place_id}")).await;
    assert_eq!(body["data"]["title"], "Mine");
}

#[tokio::test]
async fn unknown_address_is_rejected_without_upload() {
    let app = TestApp::start().await;
    let (user_id, token) = app.signup("Ada", "ada@example.com").await;
    let images_after_signup = app.stored_images();

    let (status, body) = app.create_place(&token, "Lost", "Nowhere at all").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Could not find location for address entered.");

    assert_eq!(app.stored_images(), images_after_signup);
    let (_, body) = app.get(&format!("/api/users/{user_id}")).await;
    assert_eq!(body["data"]["places"], json!([]));
    let (_, body) = app.get("/api/places").await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn invalid_place_input_is_422() {
    let app = TestApp::start().await;
    let (_, token) = app.signup("Ada", "ada@example.com").await;

    let (status, body) = app.create_place(&token, "", GOOGLEPLEX).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let req = multipart_request(
        "/api/places",
        Some(&token),
        &[("title", "No image"), ("description", "Missing image"), ("address", GOOGLEPLEX)],
        false,
    );
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn signup_and_login() {
    let app = TestApp::start().await;
    app.signup("Ada", "ada@example.com").await;

    // Same email again
    let req = multipart_request(
        "/api/users/signup",
        None,
        &[("name", "Ada 2"), ("email", "ADA@example.com"), ("password", "secret123")],
        true,
    );
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/users/login",
            None,
            json!({"email": "ada@example.com", "password": "secret123"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert_eq!(body["data"]["expiresIn"], 3600);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/users/login",
            None,
            json!({"email": "ada@example.com", "password": "wrong-password"}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert!(body["data"][0].get("passwordHash").is_none());
}

#[tokio::test]
async fn missing_resources_are_404() {
    let app = TestApp::start().await;

    let (status, body) = app.get("/api/places/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/users/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/places/user/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = TestApp::start().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.get("/api-doc/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/places").is_some());
}
